//! Integration tests for the chat engine: identity lifecycle, messaging,
//! password reset, and profile updates, against an in-memory store and a
//! recording mailer.

use std::path::Path;
use std::sync::{Arc, Mutex};

use pixelwall_auth::TokenSigner;
use pixelwall_chat::profile::ProfileUpdate;
use pixelwall_chat::reset::RESET_SENT_MESSAGE;
use pixelwall_chat::{ChatEngine, ChatError, Mailer, MailerError};
use pixelwall_db::Database;

struct SentMail {
    to: String,
    username: String,
    reset_url: String,
}

#[derive(Default)]
struct MockMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl MockMailer {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock mutex should lock").len()
    }

    fn last_reset_url(&self) -> String {
        self.sent
            .lock()
            .expect("mock mutex should lock")
            .last()
            .expect("a mail was sent")
            .reset_url
            .clone()
    }
}

#[async_trait::async_trait]
impl Mailer for MockMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> Result<(), MailerError> {
        if self.fail {
            return Err(MailerError::Delivery("mock transport down".into()));
        }
        self.sent.lock().expect("mock mutex should lock").push(SentMail {
            to: to.to_string(),
            username: username.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }
}

fn engine_with(mailer: Option<Arc<dyn Mailer>>, avatar_dir: &Path) -> ChatEngine {
    let db = Arc::new(Database::open_in_memory().expect("db"));
    ChatEngine::new(
        db,
        TokenSigner::new("test-secret"),
        mailer,
        avatar_dir.to_path_buf(),
        "http://localhost:8000".into(),
    )
}

fn engine() -> (ChatEngine, Arc<MockMailer>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mailer = Arc::new(MockMailer::default());
    let eng = engine_with(Some(mailer.clone()), dir.path());
    (eng, mailer, dir)
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode");
    bytes
}

// -- Identity --

#[tokio::test]
async fn reserve_issues_a_token_bound_to_the_name() {
    let (eng, _mailer, _dir) = engine();

    let token = eng.reserve("NeonRider", "hunter2").await.expect("reserve");
    assert_eq!(eng.token_login(&token).await.as_deref(), Some("NeonRider"));
}

#[tokio::test]
async fn reserve_rejects_taken_names_case_insensitively() {
    let (eng, _mailer, _dir) = engine();
    eng.reserve("NeonRider", "hunter2").await.expect("reserve");

    let err = eng.reserve("neonrider", "different").await.unwrap_err();
    assert_eq!(err, ChatError::AlreadyReserved);
    assert_eq!(err.to_string(), "Username already reserved.");
}

#[tokio::test]
async fn reserve_reports_taken_before_checking_the_password() {
    let (eng, _mailer, _dir) = engine();
    eng.reserve("NeonRider", "hunter2").await.expect("reserve");

    // Both problems at once: the taken check wins
    let err = eng.reserve("neonrider", "x").await.unwrap_err();
    assert_eq!(err, ChatError::AlreadyReserved);
}

#[tokio::test]
async fn reserve_enforces_the_password_minimum() {
    let (eng, _mailer, _dir) = engine();

    let err = eng.reserve("ada", "abc").await.unwrap_err();
    assert_eq!(err.to_string(), "Password must be at least 4 characters.");

    // Exactly four characters is fine
    eng.reserve("ada", "abcd").await.expect("reserve");
}

#[tokio::test]
async fn authenticate_distinguishes_unknown_name_from_wrong_password() {
    let (eng, _mailer, _dir) = engine();
    eng.reserve("ada", "hunter2").await.expect("reserve");

    let err = eng.authenticate("ada", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Wrong password.");

    let err = eng.authenticate("nobody", "whatever").await.unwrap_err();
    assert_eq!(err.to_string(), "Username not found.");
}

#[tokio::test]
async fn authenticate_reports_email_state_and_stamps_last_login() {
    let (eng, _mailer, _dir) = engine();
    eng.reserve("ada", "hunter2").await.expect("reserve");

    let auth = eng.authenticate("ADA", "hunter2").await.expect("auth");
    assert!(!auth.has_email);
    assert_eq!(eng.token_login(&auth.token).await.as_deref(), Some("ada"));

    eng.save_email("ada", "ada@example.com").await.expect("email");
    let auth = eng.authenticate("ada", "hunter2").await.expect("auth");
    assert!(auth.has_email);

    let profile = eng.get_profile("ada").await.expect("profile").expect("exists");
    assert_ne!(profile.last_seen, "Never");
}

#[tokio::test]
async fn token_login_fails_silently() {
    let (eng, _mailer, _dir) = engine();

    assert_eq!(eng.token_login("garbage").await, None);

    // A well-signed token for a name nobody reserved is just as dead
    let stray = TokenSigner::new("test-secret").issue("ghost").expect("issue");
    assert_eq!(eng.token_login(&stray).await, None);
}

#[tokio::test]
async fn check_username_reports_reservation_and_email() {
    let (eng, _mailer, _dir) = engine();

    let status = eng.check_username("ada").await.expect("check");
    assert!(!status.taken);
    assert!(!status.password_protected);

    eng.reserve("Ada", "hunter2").await.expect("reserve");
    eng.save_email("ada", "ada@example.com").await.expect("email");

    let status = eng.check_username("  ada  ").await.expect("check");
    assert_eq!(status.username, "ada");
    assert!(status.taken);
    assert!(status.password_protected);
    assert!(status.has_email);
}

#[tokio::test]
async fn save_email_validates_clears_and_requires_the_name() {
    let (eng, _mailer, _dir) = engine();
    eng.reserve("ada", "hunter2").await.expect("reserve");

    let err = eng.save_email("ada", "not-an-email").await.unwrap_err();
    assert_eq!(err, ChatError::InvalidEmail);
    let err = eng.save_email("ada", "a@b").await.unwrap_err();
    assert_eq!(err, ChatError::InvalidEmail);

    assert_eq!(
        eng.save_email("ada", "ada@example.com").await.expect("save"),
        "Email saved."
    );
    assert!(eng.check_username("ada").await.expect("check").has_email);

    assert_eq!(eng.save_email("ada", "").await.expect("clear"), "Email removed.");
    assert!(!eng.check_username("ada").await.expect("check").has_email);

    let err = eng.save_email("nobody", "a@b.com").await.unwrap_err();
    assert_eq!(err, ChatError::UsernameNotFound);
}

// -- Messaging --

#[tokio::test]
async fn public_messages_are_trimmed_truncated_and_stamped() {
    let (eng, _mailer, _dir) = engine();

    let long_message = "x".repeat(600);
    let posted = eng
        .post_public("  ada  ", &long_message)
        .await
        .expect("post")
        .expect("not dropped");

    assert_eq!(posted.username, "ada");
    assert_eq!(posted.message.chars().count(), 500);
    assert_eq!(posted.timestamp.len(), 5);
    assert_eq!(&posted.timestamp[2..3], ":");
}

#[tokio::test]
async fn empty_public_messages_are_dropped() {
    let (eng, _mailer, _dir) = engine();

    assert!(eng.post_public("ada", "   ").await.expect("post").is_none());
    assert!(eng.post_public("ada", "").await.expect("post").is_none());
    assert!(eng.recent_messages(10).await.expect("recent").is_empty());
}

#[tokio::test]
async fn long_display_names_are_capped() {
    let (eng, _mailer, _dir) = engine();

    let name = "n".repeat(60);
    let posted = eng.post_public(&name, "hi").await.expect("post").expect("kept");
    assert_eq!(posted.username.chars().count(), 50);
}

#[tokio::test]
async fn private_history_returns_newest_fifty_oldest_first() {
    let (eng, _mailer, _dir) = engine();

    for i in 0..55 {
        eng.post_private("ada", "bob", &format!("msg {i}"))
            .await
            .expect("post")
            .expect("kept");
    }

    let history = eng.private_history("ada", "bob").await.expect("history");
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].message, "msg 5");
    assert_eq!(history[49].message, "msg 54");

    // Same view from the other side
    let mirrored = eng.private_history("bob", "ada").await.expect("history");
    assert_eq!(mirrored.len(), 50);
    assert_eq!(mirrored[0].message, "msg 5");
}

#[tokio::test]
async fn private_messages_echo_both_parties() {
    let (eng, _mailer, _dir) = engine();

    let delivered = eng
        .post_private("ada", "bob", "psst")
        .await
        .expect("post")
        .expect("kept");
    assert_eq!(delivered.from, "ada");
    assert_eq!(delivered.to, "bob");
    assert_eq!(delivered.timestamp.len(), 5);

    assert!(eng.post_private("ada", "bob", "  ").await.expect("post").is_none());
}

// -- Password reset --

#[tokio::test]
async fn forgot_password_never_reveals_account_state() {
    let (eng, mailer, _dir) = engine();
    eng.reserve("ada", "hunter2").await.expect("reserve");
    eng.reserve("bare", "hunter2").await.expect("reserve");
    eng.save_email("ada", "ada@example.com").await.expect("email");

    let unknown = eng.forgot_password("nobody").await.expect("unknown");
    let no_email = eng.forgot_password("bare").await.expect("no email");
    let with_email = eng.forgot_password("ada").await.expect("with email");

    assert_eq!(unknown, RESET_SENT_MESSAGE);
    assert_eq!(no_email, RESET_SENT_MESSAGE);
    assert_eq!(with_email, RESET_SENT_MESSAGE);

    // Only the eligible request actually produced a mail
    assert_eq!(mailer.sent_count(), 1);
    {
        let sent = mailer.sent.lock().expect("mock mutex should lock");
        assert_eq!(sent[0].to, "ada@example.com");
        assert_eq!(sent[0].username, "ada");
    }
    let url = mailer.last_reset_url();
    let token = url.rsplit('/').next().expect("token segment");
    assert!(url.starts_with("http://localhost:8000/reset/"));
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn forgot_password_surfaces_delivery_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let eng = engine_with(Some(Arc::new(MockMailer::failing())), dir.path());
    eng.reserve("ada", "hunter2").await.expect("reserve");
    eng.save_email("ada", "ada@example.com").await.expect("email");

    let err = eng.forgot_password("ada").await.unwrap_err();
    assert_eq!(err, ChatError::EmailDelivery);
}

#[tokio::test]
async fn forgot_password_without_a_mailer_is_a_delivery_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let eng = engine_with(None, dir.path());
    eng.reserve("ada", "hunter2").await.expect("reserve");
    eng.save_email("ada", "ada@example.com").await.expect("email");

    let err = eng.forgot_password("ada").await.unwrap_err();
    assert_eq!(err, ChatError::EmailDelivery);
}

#[tokio::test]
async fn reset_link_round_trip() {
    let (eng, mailer, _dir) = engine();
    eng.reserve("ada", "hunter2").await.expect("reserve");
    eng.save_email("ada", "ada@example.com").await.expect("email");
    eng.forgot_password("ada").await.expect("forgot");

    let url = mailer.last_reset_url();
    let token = url.rsplit('/').next().expect("token").to_string();

    // Bad form input leaves the token alive
    let err = eng
        .confirm_password_reset(&token, "newpass", "different")
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::PasswordMismatch);
    let err = eng.confirm_password_reset(&token, "abc", "abc").await.unwrap_err();
    assert_eq!(err, ChatError::PasswordTooShort);

    // Success burns it
    let username = eng
        .confirm_password_reset(&token, "newpass", "newpass")
        .await
        .expect("confirm");
    assert_eq!(username, "ada");

    assert_eq!(
        eng.authenticate("ada", "hunter2").await.unwrap_err(),
        ChatError::WrongPassword
    );
    eng.authenticate("ada", "newpass").await.expect("new password works");

    let err = eng
        .confirm_password_reset(&token, "again", "again")
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::InvalidResetToken);
}

#[tokio::test]
async fn newer_reset_link_retires_the_older_one() {
    let (eng, mailer, _dir) = engine();
    eng.reserve("ada", "hunter2").await.expect("reserve");
    eng.save_email("ada", "ada@example.com").await.expect("email");

    eng.forgot_password("ada").await.expect("first");
    let first_url = mailer.last_reset_url();
    let first = first_url.rsplit('/').next().expect("token").to_string();

    eng.forgot_password("ada").await.expect("second");
    let second_url = mailer.last_reset_url();
    let second = second_url.rsplit('/').next().expect("token").to_string();

    let err = eng
        .confirm_password_reset(&first, "newpass", "newpass")
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::InvalidResetToken);

    eng.confirm_password_reset(&second, "newpass", "newpass")
        .await
        .expect("newest link works");
}

// -- Profile --

#[tokio::test]
async fn update_profile_applies_text_and_avatar() {
    let (eng, _mailer, dir) = engine();
    let token = eng.reserve("NeonRider", "hunter2").await.expect("reserve");

    let outcome = eng
        .update_profile(
            &token,
            ProfileUpdate {
                location: Some("  Stockton  ".into()),
                bio: Some("b".repeat(600)),
                avatar: Some(png_bytes(300, 200)),
            },
        )
        .await
        .expect("update");

    assert_eq!(outcome.username, "NeonRider");
    assert!(outcome.avatar_error.is_none());

    let stored = dir.path().join("neonrider.png");
    assert!(stored.exists());
    let img = image::open(&stored).expect("stored avatar decodes");
    assert_eq!((img.width(), img.height()), (120, 80));

    let profile = eng
        .get_profile("neonrider")
        .await
        .expect("profile")
        .expect("exists");
    assert_eq!(profile.location, "Stockton");
    assert_eq!(profile.bio.chars().count(), 500);
    assert_eq!(profile.avatar_url.as_deref(), Some("/media/avatars/neonrider.png"));
}

#[tokio::test]
async fn small_avatars_are_not_upscaled() {
    let (eng, _mailer, dir) = engine();
    let token = eng.reserve("tiny", "hunter2").await.expect("reserve");

    eng.update_profile(
        &token,
        ProfileUpdate {
            avatar: Some(png_bytes(40, 30)),
            ..Default::default()
        },
    )
    .await
    .expect("update");

    let img = image::open(dir.path().join("tiny.png")).expect("decode");
    assert_eq!((img.width(), img.height()), (40, 30));
}

#[tokio::test]
async fn bad_avatar_keeps_the_text_updates() {
    let (eng, _mailer, dir) = engine();
    let token = eng.reserve("ada", "hunter2").await.expect("reserve");

    let outcome = eng
        .update_profile(
            &token,
            ProfileUpdate {
                location: None,
                bio: Some("painting pixels".into()),
                avatar: Some(b"definitely not an image".to_vec()),
            },
        )
        .await
        .expect("update");

    assert_eq!(
        outcome.avatar_error.as_deref(),
        Some("Could not read that image.")
    );
    assert!(!dir.path().join("ada.png").exists());

    let profile = eng.get_profile("ada").await.expect("profile").expect("exists");
    assert_eq!(profile.bio, "painting pixels");
    assert_eq!(profile.avatar_url, None);
}

#[tokio::test]
async fn update_profile_rejects_bad_tokens() {
    let (eng, _mailer, _dir) = engine();

    let err = eng
        .update_profile("garbage", ProfileUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::InvalidToken);

    // Well-signed token for a name that was never reserved
    let stray = TokenSigner::new("test-secret").issue("ghost").expect("issue");
    let err = eng
        .update_profile(&stray, ProfileUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::InvalidToken);
}

#[tokio::test]
async fn unknown_profiles_are_none() {
    let (eng, _mailer, _dir) = engine();
    assert!(eng.get_profile("nobody").await.expect("profile").is_none());
}
