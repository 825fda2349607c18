use keyward_core::domain::CredentialDraft;
use keyward_core::rules::{Field, FieldErrorKind, FieldErrorsExt};
use keyward_core::secret::{HashCost, SecretInput};
use keyward_store::error::StoreError;
use keyward_store::Store;
use std::sync::Barrier;
use std::thread;
use tempfile::TempDir;

#[test]
fn concurrent_creates_with_same_email_admit_exactly_one() {
    let temp = TempDir::new().expect("temp dir");
    let db_path = temp.path().join("keyward.sqlite3");
    Store::open(&db_path)
        .expect("open store")
        .migrate()
        .expect("migrate");

    let emails = [
        "Race@Example.com",
        "RACE@example.COM",
        "race@example.com",
        "rAcE@eXample.com",
    ];
    let barrier = Barrier::new(emails.len());

    let results: Vec<Result<(), StoreError>> = thread::scope(|scope| {
        let handles: Vec<_> = emails
            .iter()
            .enumerate()
            .map(|(index, email)| {
                let barrier = &barrier;
                let db_path = &db_path;
                scope.spawn(move || {
                    let store = Store::open(db_path).expect("open store");
                    barrier.wait();
                    store
                        .credentials()
                        .create(
                            1_700_000_000,
                            CredentialDraft::new(
                                format!("User {index}"),
                                *email,
                                SecretInput::new("foobar"),
                            ),
                            HashCost::fast_test(),
                        )
                        .map(|_| ())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1, "{results:?}");
    for err in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(
            err.field_errors().has(Field::Email, FieldErrorKind::Duplicate),
            "unexpected error: {err}"
        );
    }

    let store = Store::open(&db_path).expect("reopen");
    let credentials = store.credentials().list_all().expect("list");
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].email, "race@example.com");
}
