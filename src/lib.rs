//! # Tiku Bank
//!
//! 题库复习系统核心：把学习资料交给生成服务产出题目，
//! 汇入社区共享题库，支持评分、组卷、判卷与个人错题本。
//!
//! ## 架构设计
//!
//! 本系统采用三层架构：
//!
//! ### ① 存储层（Store）
//! - `store/` - 持有连接池，负责 Schema、事务与行级读写
//! - 写事务统一走 BEGIN IMMEDIATE + 有界重试，热点行不丢更新
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只负责一件事
//! - `IngestionService` - 资料导入（生成 → 解析 → 校验 → 批量入库）
//! - `RatingService` - 社区评分（滑动均值）
//! - `PaperService` - 组卷（有序不可变快照）
//! - `GradingService` - 判卷（按题型比对 + 记错）
//! - `WrongBookService` - 错题本（只增不减的流水）
//!
//! ### ③ 应用层（App）
//! - `app` - 批量资料导入器，管理并发与统计
//!
//! 身份、页面渲染与文档导出均为外部协作方：
//! 用户ID由调用方传入，本库只提供有序数据。

pub mod app;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod store;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{NewQuestion, Paper, Question, QuestionType, WrongRecord};
pub use services::{
    GradeResult, GradingService, IngestionReport, IngestionService, LlmGenerator, PaperService,
    QuestionGenerator, RatingService, WrongBookService,
};
pub use store::{QuestionSort, Store};
