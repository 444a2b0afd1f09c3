use std::sync::Arc;

use quiz_core::model::{QuestionDraft, QuizSettings, ThemeDraft, UserId};
use quiz_core::time::fixed_now;
use services::{AppServices, Clock, QuestionServiceError, SignedInUser, ThemeChange};

fn theme_draft(title: &str) -> ThemeDraft {
    ThemeDraft {
        title: title.into(),
        description: "Flora y fauna".into(),
        icon: "leaf".into(),
        colors: vec!["#2A9D8F".into()],
        is_public: true,
    }
}

#[tokio::test]
async fn authoring_flow_create_edit_delete() {
    let author = UserId::generate();
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_authoring_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
        QuizSettings::default(),
        Arc::new(SignedInUser::new(author)),
    )
    .await
    .expect("connect sqlite");
    let themes = services.themes();
    let questions = services.questions();
    let mut changes = themes.subscribe();

    let theme = themes
        .create_theme(theme_draft("Naturaleza"))
        .await
        .expect("create theme");
    assert!(matches!(
        changes.recv().await.unwrap(),
        ThemeChange::Created(created) if created.id() == theme.id()
    ));

    let question = questions
        .create_question(QuestionDraft::with_answers(
            theme.id(),
            "¿Ave nacional del Perú?",
            ["Cóndor", "Gallito de las rocas", "Colibrí"],
            1,
        ))
        .await
        .expect("create question");
    let stored_theme = themes.get_theme(theme.id()).await.unwrap().unwrap();
    assert_eq!(stored_theme.questions_count(), 1);

    let edited = questions
        .update_question(
            question.id(),
            QuestionDraft::with_answers(
                theme.id(),
                "¿Flor nacional del Perú?",
                ["Cantuta", "Orquídea"],
                0,
            ),
        )
        .await
        .expect("update question");
    assert_eq!(edited.options().len(), 2);

    let err = questions
        .update_question(
            question.id(),
            QuestionDraft::with_answers(theme.id(), "¿Ninguna correcta?", ["a", "b"], 5),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QuestionServiceError::Question(_)));

    let renamed = themes
        .update_theme(theme.id(), theme_draft("Naturaleza peruana"))
        .await
        .expect("rename theme");
    assert_eq!(renamed.questions_count(), 1);
    assert!(matches!(changes.recv().await.unwrap(), ThemeChange::Updated(_)));

    questions
        .delete_question(question.id())
        .await
        .expect("delete question");
    let stored_theme = themes.get_theme(theme.id()).await.unwrap().unwrap();
    assert_eq!(stored_theme.questions_count(), 0);

    themes.delete_theme(theme.id()).await.expect("delete theme");
    assert_eq!(
        changes.recv().await.unwrap(),
        ThemeChange::Deleted(theme.id())
    );
    assert!(themes.get_theme(theme.id()).await.unwrap().is_none());
}
