use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tiku_bank::logger;
use tiku_bank::{
    AppError, GradingService, IngestionService, NewQuestion, PaperService, QuestionGenerator,
    QuestionSort, QuestionType, RatingService, Result, Store, WrongBookService,
};

/// 确定性的生成服务替身：返回固定文本并统计调用次数
struct FakeGenerator {
    response: String,
    calls: AtomicUsize,
}

impl FakeGenerator {
    fn new(response: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    async fn generate(&self, _material: &str, _count: usize) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

fn test_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let store = Store::open(&dir.path().join("test.db")).expect("打开数据库失败");
    (dir, store)
}

fn seed_question(
    store: &Store,
    question_type: QuestionType,
    correct_answer: &str,
    options: &[&str],
) -> i64 {
    let ids = store
        .insert_questions(&[NewQuestion {
            question_type,
            content: format!("测试题干（答案 {}）", correct_answer),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: correct_answer.to_string(),
            source_material: None,
            creator_id: 1,
        }])
        .expect("插入题目失败");
    ids[0]
}

fn long_material() -> String {
    "细胞是生物体结构和功能的基本单位。".repeat(20)
}

/// 带代码块、前后夹带说明文字的生成响应：2 条合格 + 3 条不合格
fn sample_generation_response() -> String {
    r#"好的，以下是根据资料生成的题目：
```json
{
    "questions": [
        {"type": "single_choice", "content": "植物细胞特有的结构是？", "options": ["A. 细胞膜", "B. 细胞核", "C. 叶绿体", "D. 细胞质"], "correct_answer": "C"},
        {"type": "fill_blank", "content": "细胞是生物体结构和功能的基本____。", "correct_answer": "单位"},
        {"type": "true_false", "content": "类型不在约定范围内", "correct_answer": "对"},
        {"type": "multiple_choice", "content": "选项数量不足", "options": ["A. 甲"], "correct_answer": "A"},
        {"type": "single_choice", "content": "", "options": ["A. 甲", "B. 乙"], "correct_answer": "A"}
    ]
}
```
希望这些题目对你有帮助！"#
        .to_string()
}

// ========== 资料导入 ==========

#[tokio::test]
async fn test_ingestion_rejects_short_material_without_external_call() {
    logger::init();
    let (_dir, store) = test_store();
    let generator = FakeGenerator::new("{}");
    let service = IngestionService::new(store, generator.clone());

    let result = service.generate_and_store("太短的资料", 10, 1).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(generator.call_count(), 0, "资料过短时不应调用生成服务");
}

#[tokio::test]
async fn test_ingestion_parses_fenced_response_and_skips_invalid_items() {
    logger::init();
    let (_dir, store) = test_store();
    let generator = FakeGenerator::new(sample_generation_response());
    let service = IngestionService::new(store.clone(), generator.clone());

    let report = service
        .generate_and_store(&long_material(), 5, 1)
        .await
        .expect("导入失败");

    assert_eq!(report.created(), 2);
    assert_eq!(report.skipped, 3);
    assert_eq!(generator.call_count(), 1);

    let first = store.question(report.created_ids[0]).expect("读取题目失败");
    assert_eq!(first.question_type, QuestionType::SingleChoice);
    assert_eq!(first.options.len(), 4);
    assert_eq!(first.correct_answer, "C");
    assert_eq!(first.score, 3.0);
    assert_eq!(first.score_count, 1);
    assert!(first.source_material.is_some());

    let second = store.question(report.created_ids[1]).expect("读取题目失败");
    assert_eq!(second.question_type, QuestionType::FillBlank);
    assert!(second.options.is_empty());
}

#[tokio::test]
async fn test_ingestion_truncates_long_source_excerpt() {
    logger::init();
    let (_dir, store) = test_store();
    let generator = FakeGenerator::new(sample_generation_response());
    let service = IngestionService::new(store.clone(), generator);

    let material = "资料内容。".repeat(130);
    let report = service
        .generate_and_store(&material, 5, 1)
        .await
        .expect("导入失败");

    let question = store.question(report.created_ids[0]).expect("读取题目失败");
    let excerpt = question.source_material.expect("缺少来源摘录");
    assert_eq!(excerpt.chars().count(), 503);
    assert!(excerpt.ends_with("..."));
}

#[tokio::test]
async fn test_ingestion_unparseable_response_is_generation_error() {
    logger::init();
    let (_dir, store) = test_store();
    let generator = FakeGenerator::new("抱歉，今天不想生成题目。");
    let service = IngestionService::new(store.clone(), generator);

    let result = service.generate_and_store(&long_material(), 10, 1).await;

    assert!(matches!(result, Err(AppError::Generation(_))));
    let remaining = store
        .list_questions(None, QuestionSort::CreateTimeDesc)
        .expect("查询失败");
    assert!(remaining.is_empty(), "解析失败时不应有任何题目入库");
}

// ========== 评分 ==========

#[test]
fn test_rating_running_mean_over_sequential_submissions() {
    logger::init();
    let (_dir, store) = test_store();
    let question_id = seed_question(&store, QuestionType::FillBlank, "单位", &[]);
    let rating = RatingService::new(store.clone());

    // 初始评分 3.0 / 1 人次
    assert_eq!(rating.submit_rating(question_id, 5.0).expect("评分失败"), 4.0);
    assert_eq!(rating.submit_rating(question_id, 4.0).expect("评分失败"), 4.0);
    assert_eq!(rating.submit_rating(question_id, 2.0).expect("评分失败"), 3.5);

    let question = store.question(question_id).expect("读取题目失败");
    assert_eq!(question.score, 3.5);
    assert_eq!(question.score_count, 4);
}

#[test]
fn test_rating_out_of_range_leaves_state_unchanged() {
    logger::init();
    let (_dir, store) = test_store();
    let question_id = seed_question(&store, QuestionType::FillBlank, "单位", &[]);
    let rating = RatingService::new(store.clone());

    for bad in [0.9, 5.1, -1.0] {
        assert!(matches!(
            rating.submit_rating(question_id, bad),
            Err(AppError::Validation(_))
        ));
    }

    let question = store.question(question_id).expect("读取题目失败");
    assert_eq!(question.score, 3.0);
    assert_eq!(question.score_count, 1);
}

#[test]
fn test_rating_missing_question_is_not_found() {
    logger::init();
    let (_dir, store) = test_store();
    let rating = RatingService::new(store);

    assert!(matches!(
        rating.submit_rating(9999, 4.0),
        Err(AppError::NotFound { .. })
    ));
}

#[test]
fn test_concurrent_ratings_lose_no_updates() {
    logger::init();
    let (_dir, store) = test_store();
    let question_id = seed_question(&store, QuestionType::FillBlank, "单位", &[]);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            let rating = RatingService::new(store);
            for _ in 0..5 {
                rating.submit_rating(question_id, 3.0).expect("并发评分失败");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("评分线程失败");
    }

    let question = store.question(question_id).expect("读取题目失败");
    assert_eq!(question.score_count, 41, "并发提交不应丢失任何一次评分");
    assert_eq!(question.score, 3.0);
}

// ========== 组卷 ==========

#[test]
fn test_paper_preserves_selection_order() {
    logger::init();
    let (_dir, store) = test_store();
    let q1 = seed_question(&store, QuestionType::SingleChoice, "A", &["A. 甲", "B. 乙"]);
    let q2 = seed_question(&store, QuestionType::SingleChoice, "B", &["A. 甲", "B. 乙"]);
    let q3 = seed_question(&store, QuestionType::FillBlank, "单位", &[]);
    let paper_service = PaperService::new(store.clone());

    let paper = paper_service
        .create_paper("期中模拟卷", &[q3, q1, q2], None, 1)
        .expect("组卷失败");

    assert_eq!(paper.question_ids, vec![q3, q1, q2]);
    assert_eq!(paper.question_count(), 3);
    assert_eq!(paper.total_score, 100);

    let (read_back, questions) = paper_service
        .paper_with_questions(paper.id)
        .expect("读取卷子失败");
    assert_eq!(read_back.question_ids, vec![q3, q1, q2]);
    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    assert_eq!(question_ids, vec![q3, q1, q2], "题目应按出卷顺序返回");
}

#[test]
fn test_paper_rejects_invalid_selection() {
    logger::init();
    let (_dir, store) = test_store();
    let q1 = seed_question(&store, QuestionType::FillBlank, "单位", &[]);
    let paper_service = PaperService::new(store.clone());

    // 引用了不存在的题目：整体失败，无部分写入
    assert!(matches!(
        paper_service.create_paper("坏卷子", &[q1, 9999], None, 1),
        Err(AppError::NotFound { .. })
    ));
    assert!(matches!(store.paper(1), Err(AppError::NotFound { .. })));

    assert!(matches!(
        paper_service.create_paper("  ", &[q1], None, 1),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        paper_service.create_paper("空卷", &[], None, 1),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        paper_service.create_paper("零分卷", &[q1], Some(0), 1),
        Err(AppError::Validation(_))
    ));
}

// ========== 判卷与错题本 ==========

#[test]
fn test_grading_scores_and_records_wrong_questions() {
    logger::init();
    let (_dir, store) = test_store();
    let ids: Vec<i64> = (0..10)
        .map(|_| seed_question(&store, QuestionType::SingleChoice, "A", &["A. 甲", "B. 乙"]))
        .collect();
    let paper_service = PaperService::new(store.clone());
    let paper = paper_service
        .create_paper("判卷测试卷", &ids, None, 1)
        .expect("组卷失败");

    let mut answers = HashMap::new();
    for &id in &ids[..7] {
        answers.insert(id, "A".to_string());
    }
    for &id in &ids[7..9] {
        answers.insert(id, "B".to_string());
    }
    // ids[9] 未作答，视为答错

    let grading = GradingService::new(store.clone());
    let result = grading
        .grade_submission(paper.id, 42, &answers)
        .expect("判卷失败");

    assert_eq!(result.correct_count, 7);
    assert_eq!(result.score, 70);
    assert_eq!(result.total_score, 100);
    assert_eq!(result.wrong_question_ids, vec![ids[7], ids[8], ids[9]]);

    let wrong_book = WrongBookService::new(store.clone());
    let entries = wrong_book.list_for_user(42).expect("读取错题本失败");
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|(record, _)| record.wrong_count == 1));
}

#[test]
fn test_grading_per_type_comparison_policies() {
    logger::init();
    let (_dir, store) = test_store();
    let single = seed_question(&store, QuestionType::SingleChoice, "B", &["A. 甲", "B. 乙"]);
    let multiple = seed_question(
        &store,
        QuestionType::MultipleChoice,
        "A,C",
        &["A. 甲", "B. 乙", "C. 丙"],
    );
    let fill = seed_question(&store, QuestionType::FillBlank, "Paris", &[]);
    let paper_service = PaperService::new(store.clone());
    let paper = paper_service
        .create_paper("题型测试卷", &[single, multiple, fill], None, 1)
        .expect("组卷失败");

    let mut answers = HashMap::new();
    answers.insert(single, "b".to_string()); // 大小写不同 → 错
    answers.insert(multiple, "C,A".to_string()); // 顺序无关 → 对
    answers.insert(fill, " paris ".to_string()); // 去空白忽略大小写 → 对

    let grading = GradingService::new(store.clone());
    let result = grading
        .grade_submission(paper.id, 42, &answers)
        .expect("判卷失败");

    assert_eq!(result.correct_count, 2);
    assert_eq!(result.wrong_question_ids, vec![single]);
    assert_eq!(result.score, 66, "2/3 × 100 向下取整");
}

#[test]
fn test_grading_missing_paper_is_not_found() {
    logger::init();
    let (_dir, store) = test_store();
    let grading = GradingService::new(store);

    assert!(matches!(
        grading.grade_submission(9999, 1, &HashMap::new()),
        Err(AppError::NotFound { .. })
    ));
}

#[test]
fn test_wrong_tracker_increments_and_orders_by_recency() {
    logger::init();
    let (_dir, store) = test_store();
    let q1 = seed_question(&store, QuestionType::FillBlank, "甲", &[]);
    let q2 = seed_question(&store, QuestionType::FillBlank, "乙", &[]);
    let wrong_book = WrongBookService::new(store.clone());

    wrong_book.record_wrong(7, q1).expect("记录错题失败");
    std::thread::sleep(Duration::from_millis(20));
    wrong_book.record_wrong(7, q2).expect("记录错题失败");

    let entries = wrong_book.list_for_user(7).expect("读取错题本失败");
    let ordered: Vec<i64> = entries.iter().map(|(r, _)| r.question_id).collect();
    assert_eq!(ordered, vec![q2, q1], "最近答错的应排在前面");
    let q1_first_wrong = entries[1].0.last_wrong_time;

    // 再次答错 q1：次数累加、时间刷新、排到最前
    std::thread::sleep(Duration::from_millis(20));
    wrong_book.record_wrong(7, q1).expect("记录错题失败");

    let entries = wrong_book.list_for_user(7).expect("读取错题本失败");
    let ordered: Vec<i64> = entries.iter().map(|(r, _)| r.question_id).collect();
    assert_eq!(ordered, vec![q1, q2]);

    let (q1_record, q1_question) = &entries[0];
    assert_eq!(q1_record.wrong_count, 2);
    assert!(q1_record.last_wrong_time > q1_first_wrong);
    assert!(q1_record.create_time <= q1_record.last_wrong_time);
    assert_eq!(q1_question.id, q1);

    // 错题本按用户隔离
    assert!(wrong_book.list_for_user(8).expect("读取错题本失败").is_empty());
}

#[test]
fn test_wrong_tracker_rejects_missing_question() {
    logger::init();
    let (_dir, store) = test_store();
    let wrong_book = WrongBookService::new(store);

    assert!(matches!(
        wrong_book.record_wrong(7, 9999),
        Err(AppError::NotFound { .. })
    ));
}

// ========== 题库浏览 ==========

#[test]
fn test_question_listing_filter_and_sort() {
    logger::init();
    let (_dir, store) = test_store();
    let q_fill = seed_question(&store, QuestionType::FillBlank, "单位", &[]);
    let q_single = seed_question(&store, QuestionType::SingleChoice, "A", &["A. 甲", "B. 乙"]);

    let rating = RatingService::new(store.clone());
    rating.submit_rating(q_single, 5.0).expect("评分失败"); // 单选题升到 4.0

    let all = store
        .list_questions(None, QuestionSort::ScoreDesc)
        .expect("查询失败");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, q_single, "评分高的应排在前面");

    let fills = store
        .list_questions(Some(QuestionType::FillBlank), QuestionSort::ScoreDesc)
        .expect("查询失败");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].id, q_fill);
}
