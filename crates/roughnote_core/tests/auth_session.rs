use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{FixedOffset, TimeZone};
use roughnote_core::db::open_db_in_memory;
use roughnote_core::model::identity::{SESSION_KEY, USERS_KEY};
use roughnote_core::service::auth_service::{
    ERR_ACCOUNT_EXISTS, ERR_GOOGLE_FAILED, ERR_GOOGLE_NO_CREDENTIAL, ERR_INVALID_CREDENTIALS,
    ERR_INVALID_EMAIL, GOOGLE_AUTH_MARKER,
};
use roughnote_core::{
    AppContext, AuthService, EntryStore, Identity, KvStore, ManualClock, NewEntry, SqliteKvStore,
};

fn clock() -> ManualClock {
    ManualClock::new(
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 10, 8, 0, 0)
            .unwrap(),
    )
}

fn google_token(email: &str) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"email":"{email}","sub":"123"}}"#));
    format!("eyJhbGciOiJSUzI1NiJ9.{payload}.sig")
}

fn entry_json(id: &str, topic: &str) -> String {
    format!(r#"{{"id":"{id}","createdAt":"2024-06-01T10:00:00Z","topic":"{topic}"}}"#)
}

#[test]
fn sign_up_then_sign_in_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteKvStore::new(&conn));

    let created = auth.sign_up(" Ana@Example.com ", "secret");
    assert!(created.is_ok());
    assert_eq!(created.user.unwrap().email, "ana@example.com");

    let registry = SqliteKvStore::new(&conn).get(USERS_KEY).unwrap().unwrap();
    assert!(!registry.contains("secret"));

    let duplicate = auth.sign_up("ana@example.com", "other");
    assert_eq!(duplicate.error.as_deref(), Some(ERR_ACCOUNT_EXISTS));

    let wrong = auth.sign_in("ana@example.com", "nope");
    assert_eq!(wrong.error.as_deref(), Some(ERR_INVALID_CREDENTIALS));
    let unknown = auth.sign_in("who@example.com", "secret");
    assert_eq!(unknown.error.as_deref(), Some(ERR_INVALID_CREDENTIALS));

    let signed_in = auth.sign_in("ANA@example.com", "secret");
    assert!(signed_in.is_ok());
    assert_eq!(
        auth.current_user().unwrap().map(|user| user.email),
        Some("ana@example.com".to_string())
    );
}

#[test]
fn sign_up_rejects_bad_email() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteKvStore::new(&conn));

    let response = auth.sign_up("not-an-email", "secret");
    assert_eq!(response.error.as_deref(), Some(ERR_INVALID_EMAIL));
    assert!(SqliteKvStore::new(&conn).get(USERS_KEY).unwrap().is_none());
}

#[test]
fn sign_out_clears_session_and_context_falls_back_to_guest() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::new(&conn);
    let auth = AuthService::new(SqliteKvStore::new(&conn));

    auth.sign_up("bo@example.com", "pw").user.unwrap();
    assert_eq!(
        AppContext::load(&kv).unwrap().identity,
        Identity::account("bo@example.com")
    );

    auth.sign_out().unwrap();
    assert!(kv.get(SESSION_KEY).unwrap().is_none());
    assert!(auth.current_user().unwrap().is_none());
    assert_eq!(AppContext::load(&kv).unwrap().identity, Identity::Guest);
}

#[test]
fn google_sign_in_registers_marker_and_handles_bad_tokens() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(SqliteKvStore::new(&conn));

    let missing = auth.sign_in_with_google(None);
    assert_eq!(missing.error.as_deref(), Some(ERR_GOOGLE_NO_CREDENTIAL));
    let blank = auth.sign_in_with_google(Some("  "));
    assert_eq!(blank.error.as_deref(), Some(ERR_GOOGLE_NO_CREDENTIAL));
    let garbage = auth.sign_in_with_google(Some("a.b!c.d"));
    assert_eq!(garbage.error.as_deref(), Some(ERR_GOOGLE_FAILED));

    let response = auth.sign_in_with_google(Some(&google_token("Cy@Example.com")));
    assert_eq!(response.user.unwrap().email, "cy@example.com");

    let registry = SqliteKvStore::new(&conn).get(USERS_KEY).unwrap().unwrap();
    assert!(registry.contains(GOOGLE_AUTH_MARKER));

    let password = auth.sign_in("cy@example.com", GOOGLE_AUTH_MARKER);
    assert_eq!(password.error.as_deref(), Some(ERR_INVALID_CREDENTIALS));
}

#[test]
fn sign_in_migrates_guest_entries_into_account() {
    let conn = open_db_in_memory().unwrap();
    let clock = clock();
    let guest_id = {
        let mut guest =
            EntryStore::open(SqliteKvStore::new(&conn), &clock, Identity::Guest).unwrap();
        guest.add(NewEntry::note("from guest")).unwrap().id
    };

    let auth = AuthService::new(SqliteKvStore::new(&conn));
    auth.sign_up("dee@example.com", "pw").user.unwrap();
    let account_id = {
        let mut store = EntryStore::open(
            SqliteKvStore::new(&conn),
            &clock,
            Identity::account("dee@example.com"),
        )
        .unwrap();
        assert_eq!(store.entries().len(), 1);
        store.add(NewEntry::note("from account")).unwrap().id
    };
    auth.sign_out().unwrap();

    let mut guest = EntryStore::open(SqliteKvStore::new(&conn), &clock, Identity::Guest).unwrap();
    assert!(guest.entries().is_empty());
    let second_guest_id = guest.add(NewEntry::note("later guest")).unwrap().id;

    assert!(auth.sign_in("dee@example.com", "pw").is_ok());

    let store = EntryStore::open(
        SqliteKvStore::new(&conn),
        &clock,
        Identity::account("dee@example.com"),
    )
    .unwrap();
    let ids: Vec<&str> = store.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, [second_guest_id.as_str(), account_id.as_str(), guest_id.as_str()]);
    assert!(SqliteKvStore::new(&conn)
        .get(&Identity::Guest.entries_key())
        .unwrap()
        .is_none());
}

#[test]
fn account_entry_wins_id_collision() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::new(&conn);
    kv.set(
        &Identity::Guest.entries_key(),
        &format!("[{},{}]", entry_json("a", "guest a"), entry_json("shared", "guest copy")),
    )
    .unwrap();
    kv.set(
        &Identity::account("eve@example.com").entries_key(),
        &format!("[{}]", entry_json("shared", "account copy")),
    )
    .unwrap();

    let auth = AuthService::new(SqliteKvStore::new(&conn));
    auth.sign_up("eve@example.com", "pw").user.unwrap();

    let clock = clock();
    let store = EntryStore::open(
        SqliteKvStore::new(&conn),
        &clock,
        Identity::account("eve@example.com"),
    )
    .unwrap();
    let topics: Vec<&str> = store.entries().iter().map(|e| e.topic.as_str()).collect();
    assert_eq!(topics, ["guest a", "account copy"]);
}

#[test]
fn malformed_guest_slot_is_left_in_place() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::new(&conn);
    kv.set(&Identity::Guest.entries_key(), "{broken").unwrap();

    let auth = AuthService::new(SqliteKvStore::new(&conn));
    assert!(auth.sign_up("fay@example.com", "pw").is_ok());

    assert_eq!(
        kv.get(&Identity::Guest.entries_key()).unwrap().as_deref(),
        Some("{broken")
    );
    assert!(kv
        .get(&Identity::account("fay@example.com").entries_key())
        .unwrap()
        .is_none());
}

#[test]
fn malformed_account_slot_blocks_the_merge() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::new(&conn);
    let guest_slot = format!("[{}]", entry_json("a", "guest a"));
    let account_key = Identity::account("gus@example.com").entries_key();
    kv.set(&Identity::Guest.entries_key(), &guest_slot).unwrap();
    kv.set(&account_key, r#"[{"id":"b","#).unwrap();

    let auth = AuthService::new(SqliteKvStore::new(&conn));
    assert!(auth.sign_up("gus@example.com", "pw").is_ok());

    assert_eq!(
        kv.get(&account_key).unwrap().as_deref(),
        Some(r#"[{"id":"b","#)
    );
    assert_eq!(
        kv.get(&Identity::Guest.entries_key()).unwrap(),
        Some(guest_slot)
    );
}

#[test]
fn mixed_case_legacy_account_is_adopted_on_sign_in() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::new(&conn);
    kv.set(USERS_KEY, r#"{"Hal@Example.com":"pw"}"#).unwrap();
    kv.set(
        "rough-entries-Hal@Example.com",
        &format!("[{}]", entry_json("h1", "old note")),
    )
    .unwrap();

    let auth = AuthService::new(SqliteKvStore::new(&conn));
    let wrong = auth.sign_in("hal@example.com", "nope");
    assert_eq!(wrong.error.as_deref(), Some(ERR_INVALID_CREDENTIALS));

    let response = auth.sign_in("Hal@Example.com", "pw");
    assert_eq!(response.user.unwrap().email, "hal@example.com");

    let registry: serde_json::Value =
        serde_json::from_str(&kv.get(USERS_KEY).unwrap().unwrap()).unwrap();
    assert!(registry.get("Hal@Example.com").is_none());
    assert!(registry["hal@example.com"]
        .as_str()
        .unwrap()
        .starts_with("sha256:"));
    assert!(kv.get("rough-entries-Hal@Example.com").unwrap().is_none());

    let clock = clock();
    let store = EntryStore::open(
        SqliteKvStore::new(&conn),
        &clock,
        Identity::account("hal@example.com"),
    )
    .unwrap();
    assert_eq!(store.entries().len(), 1);
    assert_eq!(store.entries()[0].topic, "old note");

    assert!(auth.sign_in("HAL@example.com", "pw").is_ok());
}

#[test]
fn plaintext_password_is_rehashed_after_sign_in() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::new(&conn);
    kv.set(USERS_KEY, r#"{"ivy@example.com":"letmein"}"#).unwrap();

    let auth = AuthService::new(SqliteKvStore::new(&conn));
    assert!(auth.sign_in("ivy@example.com", "letmein").is_ok());

    let registry = kv.get(USERS_KEY).unwrap().unwrap();
    assert!(!registry.contains("letmein"));
    assert!(auth.sign_in("ivy@example.com", "letmein").is_ok());
}
