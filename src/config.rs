/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 数据库文件路径
    pub db_path: String,
    /// 资料文件存放目录
    pub material_folder: String,
    /// 每份资料生成的题目数量
    pub question_count: usize,
    /// 批量导入时题目的创建者ID（由外部身份系统分配）
    pub operator_id: i64,
    /// 同时处理的资料数量
    pub max_concurrent_materials: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// LLM 请求超时（秒）
    pub llm_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "tiku_bank.db".to_string(),
            material_folder: "materials".to_string(),
            question_count: 10,
            operator_id: 1,
            max_concurrent_materials: 4,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.deepseek.com/v1".to_string(),
            llm_model_name: "deepseek-chat".to_string(),
            llm_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            db_path: std::env::var("DB_PATH").unwrap_or(default.db_path),
            material_folder: std::env::var("MATERIAL_FOLDER").unwrap_or(default.material_folder),
            question_count: std::env::var("QUESTION_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.question_count),
            operator_id: std::env::var("OPERATOR_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(default.operator_id),
            max_concurrent_materials: std::env::var("MAX_CONCURRENT_MATERIALS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_materials),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_timeout_secs),
        }
    }
}
