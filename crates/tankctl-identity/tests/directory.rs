use std::sync::Arc;
use std::thread;

use tankctl_identity::{CredentialDirectory, Principal, SecretHash, MIN_COST};
use tankctl_types::Role;

#[test]
fn directory_is_shareable_across_threads() {
    let directory = Arc::new(
        CredentialDirectory::new([
            Principal::new(
                "admin",
                SecretHash::generate_with_cost("admin-secret", MIN_COST).expect("should hash"),
                [Role::AuthenticatedUser, Role::ConfigureAdmin],
            ),
            Principal::new(
                "viewer",
                SecretHash::generate_with_cost("viewer-secret", MIN_COST).expect("should hash"),
                [Role::AuthenticatedUser],
            ),
        ])
        .expect("directory should build"),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let directory = Arc::clone(&directory);
            thread::spawn(move || {
                assert!(directory.authenticate("admin", "admin-secret"));
                assert!(!directory.authenticate("viewer", "admin-secret"));
                directory.roles_of("viewer")
            })
        })
        .collect();

    for handle in handles {
        let roles = handle.join().expect("thread should not panic");
        assert_eq!(roles, [Role::AuthenticatedUser].into_iter().collect());
    }
}

#[test]
fn roles_are_fixed_at_registration() {
    let directory = CredentialDirectory::new([Principal::new(
        "operator",
        SecretHash::generate_with_cost("op", MIN_COST).expect("should hash"),
        [Role::Operator],
    )])
    .expect("directory should build");

    let mut roles = directory.roles_of("operator");
    roles.insert(Role::SecurityAdmin);

    assert!(!directory.roles_of("operator").contains(&Role::SecurityAdmin));
}

#[test]
fn empty_directory_rejects_everyone() {
    let directory = CredentialDirectory::new(Vec::new()).expect("empty directory is valid");
    assert!(directory.is_empty());
    assert!(!directory.authenticate("user1", "password1"));
    assert!(directory.resolve_caller("user1", "password1").is_none());
}
