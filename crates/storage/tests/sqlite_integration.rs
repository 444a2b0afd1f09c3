use chrono::Duration;
use quiz_core::model::{QuestionDraft, QuizResult, ResultId, ThemeDraft, ThemeId, UserId, UserStats};
use quiz_core::time::fixed_now;
use storage::repository::{
    NewQuestionRecord, NewThemeRecord, QuestionRepository, QuizResultRepository, StorageError,
    ThemeRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:memdb_{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn theme_record(title: &str, owner: UserId, is_public: bool, minutes: i64) -> NewThemeRecord {
    NewThemeRecord {
        fields: ThemeDraft {
            title: title.into(),
            description: "Cultura general".into(),
            icon: "llama".into(),
            colors: vec!["#D91023".into(), " ".into()],
            is_public,
        }
        .validate()
        .unwrap(),
        created_by: owner,
        created_at: fixed_now() + Duration::minutes(minutes),
    }
}

fn question_record(theme_id: ThemeId, text: &str, owner: UserId, secs: i64) -> NewQuestionRecord {
    NewQuestionRecord {
        fields: QuestionDraft::with_answers(theme_id, text, ["Lima", "Cusco", "Puno"], 0)
            .validate()
            .unwrap(),
        created_by: owner,
        created_at: fixed_now() + Duration::seconds(secs),
    }
}

#[tokio::test]
async fn themes_roundtrip_and_respect_visibility() {
    let repo = connect("themes_visibility").await;
    let alice = UserId::generate();
    let bob = UserId::generate();

    let public = repo
        .insert_theme(theme_record("Geografía", alice, true, 0))
        .await
        .unwrap();
    let private = repo
        .insert_theme(theme_record("Borrador", alice, false, 1))
        .await
        .unwrap();

    let fetched = repo.get_theme(public.id()).await.unwrap().unwrap();
    assert_eq!(fetched, public);
    assert_eq!(fetched.colors(), ["#D91023".to_string()]);
    assert_eq!(fetched.questions_count(), 0);

    let listed = repo.list_public_themes(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), public.id());

    let alice_sees = repo.list_visible_themes(alice, 10).await.unwrap();
    let ids: Vec<ThemeId> = alice_sees.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![private.id(), public.id()]);

    assert_eq!(repo.list_visible_themes(bob, 10).await.unwrap().len(), 1);
    assert!(repo.list_user_themes(bob, 10).await.unwrap().is_empty());
    assert_eq!(repo.list_user_themes(alice, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn theme_updates_keep_the_question_counter() {
    let repo = connect("theme_updates").await;
    let owner = UserId::generate();
    let mut theme = repo
        .insert_theme(theme_record("Historia", owner, true, 0))
        .await
        .unwrap();

    assert_eq!(repo.adjust_question_count(theme.id(), 2).await.unwrap(), 2);
    assert_eq!(repo.adjust_question_count(theme.id(), -5).await.unwrap(), 0);
    assert_eq!(repo.adjust_question_count(theme.id(), 1).await.unwrap(), 1);

    theme.apply_edit(theme_record("Historia Inca", owner, false, 0).fields);
    repo.update_theme(&theme).await.unwrap();

    let fetched = repo.get_theme(theme.id()).await.unwrap().unwrap();
    assert_eq!(fetched.title(), "Historia Inca");
    assert!(!fetched.is_public());
    assert_eq!(fetched.questions_count(), 1);

    assert!(matches!(
        repo.adjust_question_count(ThemeId::new(999), 1).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn questions_are_listed_oldest_first_and_cascade_with_theme() {
    let repo = connect("questions_cascade").await;
    let owner = UserId::generate();
    let theme = repo
        .insert_theme(theme_record("Capitales", owner, true, 0))
        .await
        .unwrap();

    let stored = repo
        .insert_questions(vec![
            question_record(theme.id(), "Segunda", owner, 10),
            question_record(theme.id(), "Primera", owner, 0),
        ])
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);

    let listed = repo.list_questions(theme.id()).await.unwrap();
    let texts: Vec<&str> = listed.iter().map(|q| q.text()).collect();
    assert_eq!(texts, vec!["Primera", "Segunda"]);
    assert_eq!(listed[0].options().len(), 3);
    assert!(listed[0].options()[0].is_correct);

    repo.delete_theme(theme.id()).await.unwrap();
    assert!(repo.list_questions(theme.id()).await.unwrap().is_empty());
    assert!(repo.get_question(stored[0].id()).await.unwrap().is_none());
}

#[tokio::test]
async fn unreadable_question_rows_do_not_hide_the_rest_of_the_theme() {
    let repo = connect("questions_unreadable").await;
    let owner = UserId::generate();
    let theme = repo
        .insert_theme(theme_record("Fauna", owner, true, 0))
        .await
        .unwrap();
    let good = repo
        .insert_question(question_record(theme.id(), "¿Ave nacional?", owner, 0))
        .await
        .unwrap();

    let theme_id = i64::try_from(theme.id().value()).unwrap();
    for options in [
        r#"[{"id":1,"text":"Cóndor","is_correct":true}]"#,
        r#"[{"id":1,"text":"Gallito","is_correct":true},{"id":2,"text":"  ","is_correct":false}]"#,
    ] {
        sqlx::query(
            "INSERT INTO questions (theme_id, text, options, created_by, created_at) \
             VALUES (?1, 'Rota', ?2, ?3, ?4)",
        )
        .bind(theme_id)
        .bind(options)
        .bind(owner.to_string())
        .bind(fixed_now())
        .execute(repo.pool())
        .await
        .unwrap();
    }

    let listed = repo.list_questions(theme.id()).await.unwrap();
    assert_eq!(listed, vec![good]);
}

#[tokio::test]
async fn question_edit_and_delete() {
    let repo = connect("question_edit").await;
    let owner = UserId::generate();
    let theme = repo
        .insert_theme(theme_record("Ríos", owner, true, 0))
        .await
        .unwrap();
    let mut question = repo
        .insert_question(question_record(theme.id(), "¿Río más largo?", owner, 0))
        .await
        .unwrap();

    let edit =
        QuestionDraft::with_answers(theme.id(), "¿Río más caudaloso?", ["Amazonas", "Rímac"], 0)
            .validate()
            .unwrap();
    question.apply_edit(edit);
    repo.update_question(&question).await.unwrap();

    let fetched = repo.get_question(question.id()).await.unwrap().unwrap();
    assert_eq!(fetched.text(), "¿Río más caudaloso?");
    assert_eq!(fetched.options().len(), 2);

    let removed = repo.delete_question(question.id()).await.unwrap();
    assert_eq!(removed.id(), question.id());
    assert!(matches!(
        repo.delete_question(question.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn questions_for_missing_theme_are_rejected_atomically() {
    let repo = connect("questions_missing_theme").await;
    let owner = UserId::generate();
    let theme = repo
        .insert_theme(theme_record("Fauna", owner, true, 0))
        .await
        .unwrap();

    let err = repo
        .insert_questions(vec![
            question_record(theme.id(), "Válida", owner, 0),
            question_record(ThemeId::new(4040), "Huérfana", owner, 1),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(repo.list_questions(theme.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn results_are_appended_and_listed_newest_first() {
    let repo = connect("results_history").await;
    let alice = UserId::generate();
    let bob = UserId::generate();
    let theme = ThemeId::new(3);

    let early = QuizResult::new(theme, "Historia", alice, 2, 3, fixed_now()).unwrap();
    let late =
        QuizResult::new(theme, "Historia", alice, 3, 3, fixed_now() + Duration::hours(2)).unwrap();
    let other = QuizResult::new(theme, "Historia", bob, 1, 3, fixed_now()).unwrap();

    let early_id = repo.append_result(&early).await.unwrap();
    let late_id = repo.append_result(&late).await.unwrap();
    repo.append_result(&other).await.unwrap();

    let rows = repo.list_user_results(alice, 10).await.unwrap();
    let ids: Vec<ResultId> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![late_id, early_id]);
    assert_eq!(rows[1].result, early);
    assert_eq!(rows[1].result.percentage(), 67);

    assert_eq!(repo.get_result(late_id).await.unwrap(), late);
    assert!(matches!(
        repo.get_result(ResultId::new(10_000)).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn user_stats_aggregate_every_result_of_the_user() {
    let repo = connect("results_stats").await;
    let alice = UserId::generate();
    let theme = ThemeId::new(5);

    let mut recorded = Vec::new();
    for (minutes, score, total) in [(0, 2, 3), (1, 1, 2), (2, 4, 4), (3, 1, 8), (4, 0, 5)] {
        let result = QuizResult::new(
            theme,
            "Geografía",
            alice,
            score,
            total,
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap();
        repo.append_result(&result).await.unwrap();
        recorded.push(result);
    }
    let other = QuizResult::new(theme, "Geografía", UserId::generate(), 3, 3, fixed_now()).unwrap();
    repo.append_result(&other).await.unwrap();

    assert_eq!(repo.list_user_results(alice, 2).await.unwrap().len(), 2);
    let stats = repo.user_stats(alice).await.unwrap();
    assert_eq!(stats, UserStats::from_results(&recorded));
    assert_eq!(stats.quizzes_taken, 5);
    assert_eq!(stats.correct_answers, 8);
    assert_eq!(stats.total_questions, 22);
    // (67 + 50 + 100 + 13 + 0) / 5 = 46
    assert_eq!(stats.average_score, 46);

    assert_eq!(
        repo.user_stats(UserId::generate()).await.unwrap(),
        UserStats::default()
    );
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let theme = repo
        .insert_theme(theme_record("Música", UserId::generate(), true, 0))
        .await
        .unwrap();
    assert!(repo.get_theme(theme.id()).await.unwrap().is_some());
}
