//! Authorization engine behavior over realistic resource trees

use assert_matches::assert_matches;
use safeharbor_authorization::{AccessControl, AccessDecision, Authorizer};
use safeharbor_core::{Action, HarborError, PermissionMask};
use safeharbor_store::EntitySource;
use safeharbor_testkit::{assert_acl_index_consistent, init_test_tracing, Fixture};

#[test]
fn realm_grant_reaches_repo_but_not_dockerfile() {
    init_test_tracing();
    let fx = Fixture::new();
    let acme = fx.realm("acme");
    let alice = fx.user(&acme, "alice");
    fx.make_admin(&acme, &alice);
    fx.grant(&acme, &alice, PermissionMask::FULL);
    let webapp = fx.repo(&acme, "webapp");
    let dockerfile = fx.dockerfile(&webapp, "Dockerfile1");

    let authz = Authorizer::new(fx.store().clone());
    assert_eq!(authz.authorize(&alice, Action::Read, &webapp).unwrap(), AccessDecision::Allow);
    // The parent check stops at the repo; the realm is two levels up
    assert_eq!(authz.authorize(&alice, Action::Read, &dockerfile).unwrap(), AccessDecision::Deny);

    fx.grant(&webapp, &alice, PermissionMask::only(Action::Read));
    assert_eq!(authz.authorize(&alice, Action::Read, &dockerfile).unwrap(), AccessDecision::Allow);
    assert_eq!(authz.authorize(&alice, Action::Write, &dockerfile).unwrap(), AccessDecision::Deny);
}

#[test]
fn group_grant_covers_members_without_personal_entries() {
    let fx = Fixture::new();
    let acme = fx.realm("acme");
    let bob = fx.user(&acme, "bob");
    let devs = fx.group(&acme, "devs");
    fx.join(&devs, &bob);
    let webapp = fx.repo(&acme, "webapp");
    fx.grant(&webapp, &devs, PermissionMask::only(Action::Write));

    let authz = Authorizer::new(fx.store().clone());
    assert_eq!(authz.authorize(&bob, Action::Write, &webapp).unwrap(), AccessDecision::Allow);
    let view = fx.store().view();
    assert!(view.user(&bob).unwrap().party.acl_entry_ids.is_empty());
}

#[test]
fn grandparent_grant_does_not_leak_through_groups_either() {
    let fx = Fixture::new();
    let acme = fx.realm("acme");
    let carol = fx.user(&acme, "carol");
    let ops = fx.group(&acme, "ops");
    fx.join(&ops, &carol);
    fx.grant(&acme, &ops, PermissionMask::FULL);
    let webapp = fx.repo(&acme, "webapp");
    let image = fx.docker_image(&webapp, "webapp:1");

    let authz = Authorizer::new(fx.store().clone());
    for action in Action::ALL {
        assert!(authz.authorize(&carol, action, &webapp).unwrap().is_allowed());
        assert!(!authz.authorize(&carol, action, &image).unwrap().is_allowed());
    }
}

#[test]
fn self_access_and_require() {
    let fx = Fixture::new();
    let acme = fx.realm("acme");
    let dave = fx.user(&acme, "dave");
    let webapp = fx.repo(&acme, "webapp");

    let authz = Authorizer::new(fx.store().clone());
    for action in Action::ALL {
        assert!(authz.require(&dave, action, &dave).is_ok());
    }
    assert_matches!(authz.require(&dave, Action::Read, &webapp), Err(HarborError::Forbidden { .. }));
    assert_matches!(
        authz.require(&dave, Action::Read, &"404".into()),
        Err(HarborError::NotFound { .. })
    );
    assert_matches!(
        authz.authorize_mask(&dave, PermissionMask::FULL, &webapp),
        Err(HarborError::Invalid { .. })
    );
}

#[test]
fn accessible_resources_lists_my_realms_and_repos() {
    let fx = Fixture::new();
    let acme = fx.realm("acme");
    let globex = fx.realm("globex");
    let erin = fx.user(&acme, "erin");
    let devs = fx.group(&acme, "devs");
    fx.join(&devs, &erin);
    let webapp = fx.repo(&acme, "webapp");
    let flag = fx.flag(&webapp, "green");
    fx.grant(&acme, &erin, PermissionMask::only(Action::Read));
    fx.grant(&webapp, &devs, PermissionMask::only(Action::Write));
    fx.grant(&flag, &erin, PermissionMask::only(Action::Read));
    fx.grant(&globex, &erin, PermissionMask::NONE);

    let found = Authorizer::new(fx.store().clone())
        .accessible_resources(&erin)
        .unwrap();
    assert_eq!(found.realm_ids, vec![acme]);
    assert_eq!(found.repo_ids, vec![webapp]);
    assert_eq!(found.leaf_ids, vec![flag]);
}

#[test]
fn access_control_service_keeps_index_consistent() {
    let fx = Fixture::new();
    let acme = fx.realm("acme");
    let frank = fx.user(&acme, "frank");
    let devs = fx.group(&acme, "devs");
    let webapp = fx.repo(&acme, "webapp");
    let acl = AccessControl::new(fx.store().clone());

    acl.add_access(&webapp, &frank, PermissionMask::only(Action::Read)).unwrap();
    let again = acl.add_access(&webapp, &frank, PermissionMask::only(Action::Read)).unwrap();
    assert_eq!(again.mask, PermissionMask::only(Action::Read));
    acl.set_access(&webapp, &devs, PermissionMask::FULL).unwrap();
    acl.set_access(&acme, &devs, PermissionMask::only(Action::CreateIn)).unwrap();
    assert_eq!(acl.descriptors(&webapp).unwrap().len(), 2);
    assert_acl_index_consistent(fx.store());

    assert!(acl.remove_access(&webapp, &frank).unwrap());
    assert!(!acl.remove_access(&webapp, &frank).unwrap());
    assert_eq!(acl.remove_all_party_access(&devs).unwrap(), 2);
    assert!(acl.entry_for(&webapp, &devs).unwrap().is_none());
    assert_acl_index_consistent(fx.store());

    // Locks are released once each call returns
    assert!(!fx.store().locks().is_locked(&webapp));
    assert!(!fx.store().locks().is_locked(&devs));
}
