//! Integration tests for the authentication service.

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tally_auth::config::AuthConfig;
use tally_auth::service::{AuthService, SignUpInput};
use tally_auth::token::TokenCodec;
use tally_core::error::TallyError;
use tally_core::repository::{IdentityRepository, PermissionStore};
use tally_db::{SurrealIdentityRepository, SurrealPermissionStore};
use uuid::Uuid;

const SIGNING_KEY: &str = include_str!("../testdata/signing_key.pem");

type Service = AuthService<SurrealIdentityRepository<Db>, SurrealPermissionStore<Db>>;

fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_issuer: "tally-test".into(),
        min_password_length: 8,
        ..AuthConfig::default()
    }
}

/// Spin up an in-memory DB with migrations and build the service on it.
async fn setup() -> (Service, Surreal<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tally_db::run_migrations(&db).await.unwrap();

    let config = test_config();
    let codec = Arc::new(TokenCodec::from_private_pem(SIGNING_KEY, &config).unwrap());
    let service = AuthService::new(
        SurrealIdentityRepository::new(db.clone()),
        SurrealPermissionStore::new(db.clone()),
        codec,
        config,
    );
    (service, db)
}

fn alice() -> SignUpInput {
    SignUpInput {
        name: "Alice".into(),
        second_name: "Smith".into(),
        patronymic: String::new(),
        email: "  Alice@Example.com ".into(),
        password: "correct-horse".into(),
    }
}

/// Put `identity` into a group called `group_name` through a fresh role.
async fn join_group(db: &Surreal<Db>, identity: Uuid, group_name: &str) {
    let store = SurrealPermissionStore::new(db.clone());
    let role_id = Uuid::new_v4();
    let group_id = Uuid::new_v4();

    let mut tx = store.begin();
    store.stage_create_role(&mut tx, role_id, &format!("{group_name}-role"));
    store.stage_add_role_members(&mut tx, role_id, &[identity]);
    store.stage_create_group(&mut tx, group_id, group_name);
    store.stage_add_group_roles(&mut tx, group_id, &[role_id]);
    store.commit(tx).await.unwrap();
}

#[tokio::test]
async fn sign_up_then_sign_in() {
    let (service, _db) = setup().await;

    let created = service.sign_up(alice()).await.unwrap();
    assert_eq!(created.identity.email, "alice@example.com");
    assert!(created.identity.last_login.is_none());

    let claims = service
        .codec()
        .verify_access(&created.tokens.access_token)
        .unwrap();
    assert_eq!(claims.user.uuid, created.identity.id);
    assert!(!claims.is_admin);

    let signed_in = service
        .sign_in("alice@example.com", " correct-horse ")
        .await
        .unwrap();
    assert_eq!(signed_in.identity.id, created.identity.id);

    let claims = service
        .codec()
        .verify_access(&signed_in.tokens.access_token)
        .unwrap();
    assert!(claims.user.last_login > 0);

    let stored = service
        .identities()
        .get_by_id(created.identity.id)
        .await
        .unwrap();
    assert!(stored.last_login.is_some());
}

#[tokio::test]
async fn sign_up_validates_input() {
    let (service, _db) = setup().await;

    let no_name = SignUpInput {
        name: "  ".into(),
        ..alice()
    };
    assert!(matches!(
        service.sign_up(no_name).await,
        Err(TallyError::Validation { .. })
    ));

    let short = SignUpInput {
        password: "short".into(),
        ..alice()
    };
    assert!(matches!(
        service.sign_up(short).await,
        Err(TallyError::Validation { .. })
    ));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let (service, _db) = setup().await;

    service.sign_up(alice()).await.unwrap();
    let again = SignUpInput {
        email: "alice@example.com".into(),
        ..alice()
    };
    assert!(matches!(
        service.sign_up(again).await,
        Err(TallyError::AlreadyExists { .. })
    ));
}

#[tokio::test]
async fn sign_in_rejects_bad_credentials() {
    let (service, _db) = setup().await;
    service.sign_up(alice()).await.unwrap();

    assert!(matches!(
        service.sign_in("alice@example.com", "wrong-password").await,
        Err(TallyError::AuthenticationFailed { .. })
    ));
    assert!(matches!(
        service.sign_in("nobody@example.com", "correct-horse").await,
        Err(TallyError::AuthenticationFailed { .. })
    ));
    assert!(matches!(
        service.sign_in("   ", "correct-horse").await,
        Err(TallyError::Validation { .. })
    ));
    assert!(matches!(
        service.sign_in("alice@example.com", "").await,
        Err(TallyError::Validation { .. })
    ));
}

#[tokio::test]
async fn admin_flag_follows_group_membership() {
    let (service, db) = setup().await;
    let created = service.sign_up(alice()).await.unwrap();

    join_group(&db, created.identity.id, "editors").await;
    let out = service
        .sign_in("alice@example.com", "correct-horse")
        .await
        .unwrap();
    let claims = service.codec().verify_access(&out.tokens.access_token).unwrap();
    assert!(!claims.is_admin);

    join_group(&db, created.identity.id, "administrators").await;
    let out = service
        .sign_in("alice@example.com", "correct-horse")
        .await
        .unwrap();
    let claims = service.codec().verify_access(&out.tokens.access_token).unwrap();
    assert!(claims.is_admin);
}

#[tokio::test]
async fn refresh_rederives_admin_flag() {
    let (service, db) = setup().await;
    let created = service.sign_up(alice()).await.unwrap();
    let refresh_token = created.tokens.refresh_token.clone();

    join_group(&db, created.identity.id, "administrators").await;

    let out = service
        .refresh(&format!("Bearer {refresh_token}"))
        .await
        .unwrap();
    let claims = service.codec().verify_access(&out.tokens.access_token).unwrap();
    assert_eq!(claims.user.uuid, created.identity.id);
    assert!(claims.is_admin);

    // The bare token works too.
    assert!(service.refresh(&refresh_token).await.is_ok());
}

#[tokio::test]
async fn refresh_rejects_bad_tokens() {
    let (service, _db) = setup().await;
    let created = service.sign_up(alice()).await.unwrap();

    assert!(matches!(
        service.refresh("Bearer ").await,
        Err(TallyError::TokenDenied)
    ));
    assert!(matches!(
        service.refresh("garbage").await,
        Err(TallyError::AuthenticationFailed { .. })
    ));
    // An access token is not accepted in place of a refresh token.
    assert!(matches!(
        service.refresh(&created.tokens.access_token).await,
        Err(TallyError::AuthenticationFailed { .. })
    ));
}

#[tokio::test]
async fn change_password_applies_policy() {
    let (service, _db) = setup().await;
    let created = service.sign_up(alice()).await.unwrap();

    assert!(matches!(
        service.change_password(created.identity.id, "tiny").await,
        Err(TallyError::Validation { .. })
    ));

    service
        .change_password(created.identity.id, "battery-staple")
        .await
        .unwrap();
    assert!(
        service
            .sign_in("alice@example.com", "battery-staple")
            .await
            .is_ok()
    );
    assert!(
        service
            .sign_in("alice@example.com", "correct-horse")
            .await
            .is_err()
    );

    assert!(matches!(
        service.change_password(Uuid::new_v4(), "battery-staple").await,
        Err(TallyError::NotFound { .. })
    ));
}

#[tokio::test]
async fn ensure_admin_identity_creates_then_resets() {
    let (service, _db) = setup().await;

    let id = service
        .ensure_admin_identity("root@example.com", "first-secret")
        .await
        .unwrap();
    let again = service
        .ensure_admin_identity("root@example.com", "first-secret")
        .await
        .unwrap();
    assert_eq!(id, again);

    let rotated = service
        .ensure_admin_identity("root@example.com", "second-secret")
        .await
        .unwrap();
    assert_eq!(id, rotated);
    assert!(
        service
            .sign_in("root@example.com", "second-secret")
            .await
            .is_ok()
    );
    assert!(
        service
            .sign_in("root@example.com", "first-secret")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn surrounding_whitespace_in_passwords_is_ignored() {
    let (service, _db) = setup().await;
    let created = service
        .sign_up(SignUpInput {
            password: " secretpw ".into(),
            ..alice()
        })
        .await
        .unwrap();

    assert!(service.sign_in("alice@example.com", " secretpw ").await.is_ok());
    assert!(service.sign_in("alice@example.com", "secretpw").await.is_ok());

    // Padding does not count toward the minimum length.
    assert!(matches!(
        service.change_password(created.identity.id, "   tiny   ").await,
        Err(TallyError::Validation { .. })
    ));

    service
        .change_password(created.identity.id, "\tbattery-staple\n")
        .await
        .unwrap();
    assert!(
        service
            .sign_in("alice@example.com", "battery-staple")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn admin_password_from_a_secret_file_keeps_working() {
    let (service, _db) = setup().await;

    let id = service
        .ensure_admin_identity("root@example.com", "root-secret\n")
        .await
        .unwrap();
    assert!(service.sign_in("root@example.com", "root-secret").await.is_ok());

    // Same secret with and without the trailing newline is not a rotation.
    let again = service
        .ensure_admin_identity("root@example.com", "root-secret")
        .await
        .unwrap();
    assert_eq!(id, again);
    assert!(service.sign_in("root@example.com", "root-secret\n").await.is_ok());
}
