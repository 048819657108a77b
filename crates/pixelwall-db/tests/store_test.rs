//! Integration tests for the SQLite store: canvas merge semantics, identity
//! lookups, message history, and reset-token lifecycle.

use pixelwall_db::Database;
use pixelwall_types::canvas::Pixel;

fn px(x: i32, y: i32, color: &str) -> Pixel {
    Pixel {
        x,
        y,
        color: color.into(),
    }
}

#[test]
fn canvas_starts_empty_and_persists_edits() {
    let db = Database::open_in_memory().expect("open");

    assert!(db.load_canvas().expect("load").is_empty());

    db.apply_pixels(&[px(1, 2, "#ff0000"), px(3, 4, "#00ff00")])
        .expect("apply");

    let canvas = db.load_canvas().expect("load");
    assert_eq!(canvas.get("1,2").map(String::as_str), Some("#ff0000"));
    assert_eq!(canvas.get("3,4").map(String::as_str), Some("#00ff00"));
}

#[test]
fn later_edits_win_within_and_across_batches() {
    let db = Database::open_in_memory().expect("open");

    // Same cell twice in one batch: the second entry wins
    db.apply_pixels(&[px(0, 0, "#111111"), px(0, 0, "#222222")])
        .expect("apply");
    assert_eq!(
        db.load_canvas().expect("load").get("0,0").map(String::as_str),
        Some("#222222")
    );

    // A later batch overwrites again
    db.apply_pixels(&[px(0, 0, "#333333")]).expect("apply");
    assert_eq!(
        db.load_canvas().expect("load").get("0,0").map(String::as_str),
        Some("#333333")
    );
}

#[test]
fn erase_removes_the_cell() {
    let db = Database::open_in_memory().expect("open");

    db.apply_pixels(&[px(5, 5, "#abcdef")]).expect("apply");
    db.apply_pixels(&[px(5, 5, "erase")]).expect("erase");
    assert!(db.load_canvas().expect("load").is_empty());

    // Erasing a cell that was never painted is a no-op
    db.apply_pixels(&[px(9, 9, "erase")]).expect("erase");
    assert!(db.load_canvas().expect("load").is_empty());
}

#[test]
fn clear_resets_the_snapshot() {
    let db = Database::open_in_memory().expect("open");

    db.apply_pixels(&[px(1, 1, "#fff"), px(2, 2, "#000")])
        .expect("apply");
    db.clear_canvas().expect("clear");

    assert!(db.load_canvas().expect("load").is_empty());
}

#[test]
fn corrupt_snapshot_loads_as_empty() {
    let db = Database::open_in_memory().expect("open");
    db.apply_pixels(&[px(1, 1, "#fff")]).expect("apply");

    db.with_conn(|conn| {
        conn.execute("UPDATE wall_canvas SET canvas_data = 'not json' WHERE id = 1", [])?;
        Ok(())
    })
    .expect("corrupt");

    assert!(db.load_canvas().expect("load").is_empty());
}

#[test]
fn identity_lookup_is_case_insensitive() {
    let db = Database::open_in_memory().expect("open");

    db.create_identity("NeonRider", "salt:digest").expect("create");

    let row = db.get_identity("neonrider").expect("get").expect("found");
    // Stored casing survives
    assert_eq!(row.username, "NeonRider");
    assert_eq!(row.email, None);
    assert_eq!(row.last_login, None);

    // The unique index rejects a differently-cased duplicate
    assert!(db.create_identity("NEONRIDER", "other:hash").is_err());
}

#[test]
fn email_can_be_set_and_cleared() {
    let db = Database::open_in_memory().expect("open");
    db.create_identity("ada", "h:h").expect("create");

    db.set_email("Ada", Some("ada@example.com")).expect("set");
    assert_eq!(
        db.get_identity("ada").expect("get").expect("found").email.as_deref(),
        Some("ada@example.com")
    );

    db.set_email("ada", None).expect("clear");
    assert_eq!(db.get_identity("ada").expect("get").expect("found").email, None);
}

#[test]
fn last_login_stamp_is_recorded() {
    let db = Database::open_in_memory().expect("open");
    db.create_identity("ada", "h:h").expect("create");

    db.stamp_last_login("ADA").expect("stamp");

    let row = db.get_identity("ada").expect("get").expect("found");
    assert!(row.last_login.is_some());
}

#[test]
fn public_messages_come_back_oldest_first_capped() {
    let db = Database::open_in_memory().expect("open");

    for i in 0..5 {
        db.insert_public_message("ada", &format!("msg {i}")).expect("insert");
    }

    let recent = db.recent_public_messages(3).expect("query");
    assert_eq!(recent.len(), 3);
    // Newest 3, oldest of those first
    assert_eq!(recent[0].message, "msg 2");
    assert_eq!(recent[2].message, "msg 4");
}

#[test]
fn private_history_is_pair_symmetric_and_capped() {
    let db = Database::open_in_memory().expect("open");

    db.insert_private_message("ada", "bob", "one").expect("insert");
    db.insert_private_message("bob", "ada", "two").expect("insert");
    db.insert_private_message("ada", "bob", "three").expect("insert");
    // Unrelated conversation must not leak in
    db.insert_private_message("ada", "eve", "secret").expect("insert");

    // Same result regardless of argument order
    let a = db.recent_private_messages("ada", "bob", 50).expect("query");
    let b = db.recent_private_messages("bob", "ada", 50).expect("query");
    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 3);
    assert_eq!(a[0].message, "one");
    assert_eq!(a[2].message, "three");
    assert_eq!(b[0].message, "one");

    // Cap keeps the newest, still oldest-first
    let capped = db.recent_private_messages("ada", "bob", 2).expect("query");
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].message, "two");
    assert_eq!(capped[1].message, "three");
}

#[test]
fn reset_token_lifecycle() {
    let db = Database::open_in_memory().expect("open");
    let id = db.create_identity("ada", "h:h").expect("create");

    db.create_reset_token(id, "token-one").expect("create token");
    let lookup = db.valid_reset_token("token-one").expect("lookup").expect("valid");
    assert_eq!(lookup.username, "ada");
    assert_eq!(lookup.username_id, id);

    // Issuing a new token retires the old one
    db.create_reset_token(id, "token-two").expect("create token");
    assert!(db.valid_reset_token("token-one").expect("lookup").is_none());
    assert!(db.valid_reset_token("token-two").expect("lookup").is_some());

    // Consuming applies the password and burns the token
    let lookup = db.valid_reset_token("token-two").expect("lookup").expect("valid");
    db.consume_reset_token(lookup.token_id, lookup.username_id, "new:hash")
        .expect("consume");
    assert!(db.valid_reset_token("token-two").expect("lookup").is_none());
    assert_eq!(
        db.get_identity("ada").expect("get").expect("found").password_hash,
        "new:hash"
    );
}

#[test]
fn reset_token_expires_after_an_hour() {
    let db = Database::open_in_memory().expect("open");
    let id = db.create_identity("ada", "h:h").expect("create");
    db.create_reset_token(id, "stale-token").expect("create token");

    db.with_conn(|conn| {
        conn.execute(
            "UPDATE password_reset_tokens SET created_at = datetime('now', '-2 hours')",
            [],
        )?;
        Ok(())
    })
    .expect("age token");

    assert!(db.valid_reset_token("stale-token").expect("lookup").is_none());
}

#[test]
fn unknown_reset_token_is_invalid() {
    let db = Database::open_in_memory().expect("open");
    assert!(db.valid_reset_token("never-issued").expect("lookup").is_none());
}
