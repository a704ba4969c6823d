//! Integration tests for capability checks on authenticated requests.

mod helpers;

use chrono::Duration;

use helpers::TestContext;
use warden_auth::{Capability, capabilities_of};
use warden_core::ErrorKind;
use warden_core::types::PrincipalId;
use warden_directory::UserRepository;
use warden_entity::{Role, Status};

#[tokio::test]
async fn test_authorize_follows_role_table() {
    let ctx = TestContext::new().await;
    ctx.create_principal("root@example.com", Role::Admin, Status::Active)
        .await;
    ctx.create_principal("mod@example.com", Role::Moderator, Status::Active)
        .await;
    ctx.create_user("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    for (email, role) in [
        ("root@example.com", Role::Admin),
        ("mod@example.com", Role::Moderator),
        ("ada@example.com", Role::User),
    ] {
        let token = ctx.login(email).await.tokens.access_token;
        let granted = capabilities_of(role);
        for capability in Capability::ALL {
            let result = sessions.authorize(&token, capability).await;
            if granted.contains(&capability) {
                assert!(result.is_ok(), "{role} should hold {capability}");
            } else {
                assert_eq!(
                    result.unwrap_err().kind,
                    ErrorKind::Forbidden,
                    "{role} should not hold {capability}"
                );
            }
        }
    }
}

#[tokio::test]
async fn test_unauthenticated_is_distinct_from_forbidden() {
    let ctx = TestContext::new().await;
    ctx.create_user("ada@example.com").await;
    let token = ctx.login("ada@example.com").await.tokens.access_token;
    let sessions = &ctx.services.sessions;

    let err = sessions
        .authorize(&token, Capability::ListAllUsers)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = sessions
        .authorize("", Capability::ViewProfile)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedToken);

    let err = ctx
        .services
        .access
        .require_identity(None, Capability::ViewProfile)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn test_demotion_applies_to_live_tokens() {
    let ctx = TestContext::new().await;
    let admin = ctx
        .create_principal("root@example.com", Role::Admin, Status::Active)
        .await;
    let token = ctx.login("root@example.com").await.tokens.access_token;
    let sessions = &ctx.services.sessions;

    assert!(sessions.authorize(&token, Capability::DeleteUser).await.is_ok());

    ctx.users.update_role(admin.id, Role::User).await.unwrap();
    let err = sessions
        .authorize(&token, Capability::DeleteUser)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_admin_revokes_sessions_of_another_principal() {
    let ctx = TestContext::new().await;
    ctx.create_principal("root@example.com", Role::Admin, Status::Active)
        .await;
    ctx.create_principal("mod@example.com", Role::Moderator, Status::Active)
        .await;
    let target = ctx.create_user("ada@example.com").await;
    let (admin_login, admin) = ctx.identity("root@example.com").await;
    let (_, moderator) = ctx.identity("mod@example.com").await;
    let target_login = ctx.login("ada@example.com").await;
    let sessions = &ctx.services.sessions;

    let err = sessions
        .revoke_sessions_of(&moderator, target.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let err = sessions
        .revoke_sessions_of(&admin, PrincipalId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    ctx.clock.advance(Duration::seconds(1));
    sessions.revoke_sessions_of(&admin, target.id).await.unwrap();

    let err = sessions
        .authenticate(&target_login.tokens.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenRevoked);

    // The administrator's own session is untouched.
    assert!(
        sessions
            .authorize(&admin_login.tokens.access_token, Capability::RevokeUserSessions)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_revoke_sessions_requires_higher_role() {
    let ctx = TestContext::new().await;
    ctx.create_principal("root@example.com", Role::Admin, Status::Active)
        .await;
    let other = ctx
        .create_principal("ops@example.com", Role::Admin, Status::Active)
        .await;
    let (_, admin) = ctx.identity("root@example.com").await;
    let other_login = ctx.login("ops@example.com").await;
    let sessions = &ctx.services.sessions;

    let err = sessions
        .revoke_sessions_of(&admin, other.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert!(
        sessions
            .authenticate(&other_login.tokens.access_token)
            .await
            .is_ok()
    );
}
