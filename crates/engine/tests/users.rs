use sea_orm::{Database, DatabaseConnection};

use engine::{Engine, EngineError, EnginePolicy, Identity, LastOwnerPolicy, Role, UserStatus};
use migration::MigratorTrait;

async fn engine_with_policy(policy: EnginePolicy) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .policy(policy)
        .build()
        .await
        .unwrap();
    sign_in(&engine, "owner", "Owner").await;
    engine.bootstrap_owner("owner@example.org").await.unwrap();
    (engine, db)
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_with_policy(EnginePolicy::default()).await
}

fn identity(id: &str, name: &str) -> Identity {
    Identity {
        principal_id: id.to_string(),
        email: format!("{}@Example.org", id.to_uppercase()),
        display_name: name.to_string(),
        avatar_url: Some(format!("https://idp.example.org/{id}.png")),
    }
}

async fn sign_in(engine: &Engine, id: &str, name: &str) -> engine::User {
    engine.sign_in(&identity(id, name)).await.unwrap()
}

async fn approved(engine: &Engine, id: &str) {
    sign_in(engine, id, id).await;
    engine
        .set_user_status("owner", id, UserStatus::Approved)
        .await
        .unwrap();
}

#[tokio::test]
async fn first_sign_in_creates_pending_member() {
    let (engine, _db) = engine_with_db().await;

    let user = sign_in(&engine, "alice", "Alice").await;
    assert_eq!(user.role, Role::Member);
    assert_eq!(user.status, UserStatus::Pending);
    assert_eq!(user.email, "alice@example.org");
    assert_eq!(user.display_name, "Alice");
}

#[tokio::test]
async fn whitelisted_pending_user_is_approved_on_login() {
    let (engine, _db) = engine_with_db().await;
    let user = sign_in(&engine, "alice", "Alice").await;
    assert_eq!(user.status, UserStatus::Pending);

    engine
        .add_whitelist_entry("owner", " Alice@EXAMPLE.org ", Some("new hire"))
        .await
        .unwrap();
    let user = sign_in(&engine, "alice", "Alice").await;
    assert_eq!(user.status, UserStatus::Approved);
}

#[tokio::test]
async fn whitelist_never_overrides_a_denial() {
    let (engine, _db) = engine_with_db().await;
    sign_in(&engine, "mallory", "Mallory").await;
    engine
        .set_user_status("owner", "mallory", UserStatus::Denied)
        .await
        .unwrap();
    engine
        .add_whitelist_entry("owner", "mallory@example.org", None)
        .await
        .unwrap();

    let user = sign_in(&engine, "mallory", "Mallory").await;
    assert_eq!(user.status, UserStatus::Denied);
}

#[tokio::test]
async fn customised_profile_survives_sign_in() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "alice").await;

    engine.update_profile("alice", "  Ali  ").await.unwrap();
    let user = sign_in(&engine, "alice", "Alice From IdP").await;
    assert_eq!(user.display_name, "Ali");

    let err = engine.update_profile("alice", "   ").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));
}

#[tokio::test]
async fn avatar_upload_sets_profile_url() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "alice").await;

    let url = engine
        .upload_avatar("alice", "Me.PNG", "image/png", vec![1, 2, 3])
        .await
        .unwrap();
    assert_eq!(url, "memory://profile/alice/avatar.png");
    assert_eq!(engine.user("alice").await.unwrap().avatar_url, Some(url));
}

#[tokio::test]
async fn role_changes_follow_the_transition_table() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "alice").await;
    approved(&engine, "bob").await;

    let alice = engine.promote_to_staff("owner", "alice").await.unwrap();
    assert_eq!(alice.role, Role::Staff);

    // already staff
    let err = engine.promote_to_staff("owner", "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    // staff cannot promote
    let err = engine.promote_to_staff("alice", "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    // owners are never demoted
    let err = engine.demote_to_member("owner", "owner").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let alice = engine.demote_to_member("owner", "alice").await.unwrap();
    assert_eq!(alice.role, Role::Member);
    assert_eq!(engine.principal("alice").await.unwrap().role, Role::Member);
}

#[tokio::test]
async fn staff_review_members_but_not_owners() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "carol").await;
    engine.promote_to_staff("owner", "carol").await.unwrap();
    sign_in(&engine, "dave", "Dave").await;

    let dave = engine
        .set_user_status("carol", "dave", UserStatus::Approved)
        .await
        .unwrap();
    assert_eq!(dave.status, UserStatus::Approved);

    let err = engine
        .set_user_status("carol", "owner", UserStatus::Denied)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .set_user_status("carol", "dave", UserStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn last_owner_is_protected_by_default() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .force_user_status("owner", UserStatus::Denied)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("cannot lock out the last owner".to_string())
    );
    assert_eq!(
        engine.user("owner").await.unwrap().status,
        UserStatus::Approved
    );
}

#[tokio::test]
async fn last_owner_lockout_can_be_allowed() {
    let (engine, _db) = engine_with_policy(EnginePolicy {
        last_owner: LastOwnerPolicy::Allow,
        ..Default::default()
    })
    .await;

    let owner = engine
        .force_user_status("owner", UserStatus::Denied)
        .await
        .unwrap();
    assert_eq!(owner.status, UserStatus::Denied);
}

#[tokio::test]
async fn user_listing_is_for_staff() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "alice").await;
    sign_in(&engine, "dave", "Dave").await;

    let err = engine.list_users("alice", None).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let pending = engine
        .list_users("owner", Some(UserStatus::Pending))
        .await
        .unwrap();
    let ids: Vec<&str> = pending.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["dave"]);
    assert_eq!(engine.list_users("owner", None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn whitelist_is_owner_only_and_normalized() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "carol").await;
    engine.promote_to_staff("owner", "carol").await.unwrap();

    let err = engine
        .add_whitelist_entry("carol", "x@example.org", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .add_whitelist_entry("owner", "no-at-sign", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidEmail(_)));

    let entry = engine
        .add_whitelist_entry("owner", " New.Hire@Example.org", Some(" intern "))
        .await
        .unwrap();
    assert_eq!(entry.email, "new.hire@example.org");
    assert_eq!(entry.note, "intern");
    assert_eq!(entry.created_by, "owner");
    assert!(engine.is_whitelisted("NEW.HIRE@example.org").await.unwrap());

    engine
        .add_whitelist_entry("owner", "new.hire@example.org", Some("staff"))
        .await
        .unwrap();
    let list = engine.list_whitelist("owner").await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].note, "staff");

    engine
        .remove_whitelist_entry("owner", "new.hire@example.org")
        .await
        .unwrap();
    let err = engine
        .remove_whitelist_entry("owner", "new.hire@example.org")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("whitelist entry not exists".to_string())
    );
}

#[tokio::test]
async fn category_names_are_unique_ignoring_case() {
    let (engine, _db) = engine_with_db().await;
    approved(&engine, "alice").await;

    let travel = engine.create_category("owner", " Travel ").await.unwrap();
    assert_eq!(travel.name, "Travel");
    let err = engine.create_category("owner", "TRAVEL").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("travel".to_string()));
    let err = engine.create_category("owner", "  ").await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));
    let err = engine.create_category("alice", "Food").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let office = engine.create_category("owner", "Office").await.unwrap();
    engine
        .set_category_active("owner", office.id, false)
        .await
        .unwrap();

    let visible = engine.list_categories("alice", false).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].name, "Travel");
    let err = engine.list_categories("alice", true).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert_eq!(engine.list_categories("owner", true).await.unwrap().len(), 2);

    engine.delete_category("owner", office.id).await.unwrap();
    let err = engine.delete_category("owner", office.id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("category not exists".to_string()));
}
