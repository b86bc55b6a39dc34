//! Spec: project create/destroy and mux session ownership.

use crate::prelude::*;
use ah_engine::ManagerError;

#[tokio::test]
async fn create_then_destroy_leaves_no_session() {
    let rig = Rig::new().await;

    let project = rig
        .manager
        .create_project("alpha", "/tmp/a".into(), None)
        .await
        .unwrap();
    assert_eq!(project.mux_session, "ah-alpha");
    assert_eq!(
        rig.mux
            .list_sessions("ah")
            .await
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect::<Vec<_>>(),
        vec!["ah-alpha".to_string()]
    );

    rig.manager.delete_project("alpha").await.unwrap();
    assert!(rig.mux.list_sessions("ah").await.unwrap().is_empty());
    assert!(rig.manager.store().project("alpha").is_none());
}

#[tokio::test]
async fn session_name_is_one_to_one_with_project() {
    let rig = Rig::new().await;
    rig.manager
        .create_project("alpha", "/tmp/a".into(), None)
        .await
        .unwrap();
    rig.manager
        .create_project("beta", "/tmp/b".into(), None)
        .await
        .unwrap();

    let names = rig.mux.session_names();
    assert_eq!(names, vec!["ah-alpha".to_string(), "ah-beta".to_string()]);
}

#[tokio::test]
async fn delete_project_tears_down_agents_first() {
    let rig = Rig::with_project("alpha").await;
    rig.spawn_agent("alpha", "codex", "first-agent", "").await;
    rig.spawn_agent("alpha", "pi", "second-agent", "").await;

    rig.manager.delete_project("alpha").await.unwrap();

    assert_eq!(rig.manager.store().counts(), (0, 0));
    assert!(rig.manager.store().agent("first-agent").is_none());
    assert!(rig.mux.session_names().is_empty());
}

#[tokio::test]
async fn missing_project_is_not_found_never_a_crash() {
    let rig = Rig::new().await;
    assert!(matches!(
        rig.manager.delete_project("ghost").await,
        Err(ManagerError::ProjectNotFound(_))
    ));
}
