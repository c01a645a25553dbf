//! Party and resource lifecycle through the registry

use assert_matches::assert_matches;
use safeharbor_authentication::{Credentials, SessionConfig};
use safeharbor_core::{Action, HarborError, ObjectId, PermissionMask};
use safeharbor_registry::{
    HarborService, NewRealm, NewResource, NewScanConfig, NewUser, ScanConfigPatch, ServiceConfig,
};
use safeharbor_store::EntitySource;
use safeharbor_testkit::{
    assert_acl_index_consistent, assert_no_nested_groups, assert_parent_links_consistent,
    init_test_tracing, Fixture,
};
use std::path::PathBuf;

struct Harbor {
    fx: Fixture,
    service: HarborService,
}

impl Harbor {
    fn allowed(&self, user: &ObjectId, action: Action, resource: &ObjectId) -> bool {
        self.service
            .authorizer()
            .authorize(user, action, resource)
            .unwrap()
            .is_allowed()
    }

    fn check_invariants(&self) {
        assert_acl_index_consistent(self.fx.store());
        assert_no_nested_groups(self.fx.store());
        assert_parent_links_consistent(self.fx.store());
    }
}

fn harbor() -> Harbor {
    init_test_tracing();
    let fx = Fixture::new();
    let config = ServiceConfig {
        session: SessionConfig::with_salt("registry-tests"),
        ..ServiceConfig::default()
    };
    let service = HarborService::with_store(config, fx.store().clone(), fx.clock().clone()).unwrap();
    Harbor { fx, service }
}

/// acme administered by alice, who holds the full mask on it
fn acme(h: &Harbor) -> (ObjectId, ObjectId) {
    let (realm, alice) = h
        .service
        .registry()
        .register_realm(
            NewRealm::new("acme").org_full_name("Acme Corporation"),
            NewUser::new("alice", "s3cret").email("alice@acme.test"),
        )
        .unwrap();
    (realm.id().clone(), alice.id().clone())
}

#[test]
fn acme_alice_webapp_scenario() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);

    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp"))
        .unwrap();
    assert!(webapp.resource.acl_entry_ids.is_empty());
    assert!(h.allowed(&alice, Action::Read, webapp.id()));

    let dockerfile = registry
        .create_dockerfile(
            webapp.id(),
            NewResource::named("Dockerfile1"),
            PathBuf::from("/src/webapp/Dockerfile"),
        )
        .unwrap();
    assert!(!h.allowed(&alice, Action::Read, &dockerfile.resource.id));

    h.service
        .access()
        .set_access(webapp.id(), &alice, PermissionMask::only(Action::Read))
        .unwrap();
    assert!(h.allowed(&alice, Action::Read, &dockerfile.resource.id));
    assert!(!h.allowed(&alice, Action::Write, &dockerfile.resource.id));
    h.check_invariants();
}

#[test]
fn registered_admin_can_log_in() {
    let h = harbor();
    let (acme, alice) = acme(&h);
    let token = h
        .service
        .sessions()
        .login(&Credentials::new("alice", "s3cret"))
        .unwrap();
    assert_eq!(token.authenticated_user_id, alice);
    assert_eq!(token.realm_id, acme);
    assert!(token.is_admin_user);

    let resolved = h
        .service
        .authorize_session(&token.session_id, Action::Delete, &acme)
        .unwrap();
    assert_eq!(resolved.authenticated_user_id, alice);
}

#[test]
fn bob_in_devs_scenario() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, _) = acme(&h);
    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp"))
        .unwrap();
    let bob = registry
        .create_user(&acme, NewUser::new("bob", "hunter2"))
        .unwrap();
    let devs = registry.create_group(&acme, "devs", "developers").unwrap();
    registry.add_user_to_group(devs.id(), bob.id()).unwrap();
    h.service
        .access()
        .set_access(webapp.id(), devs.id(), PermissionMask::only(Action::Write))
        .unwrap();

    let view = h.fx.store().view();
    assert!(view.user(bob.id()).unwrap().party.acl_entry_ids.is_empty());
    assert!(view.realm(&acme).unwrap().member_user_ids.contains(bob.id()));
    drop(view);
    assert!(h.allowed(bob.id(), Action::Write, webapp.id()));
    assert!(!h.allowed(bob.id(), Action::Delete, webapp.id()));

    registry.remove_user_from_group(devs.id(), bob.id()).unwrap();
    assert!(!h.allowed(bob.id(), Action::Write, webapp.id()));
    // Membership removal leaves the group's grant in place
    assert!(h
        .service
        .access()
        .entry_for(webapp.id(), devs.id())
        .unwrap()
        .is_some());
    h.check_invariants();
}

#[test]
fn membership_rules() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);
    let devs = registry.create_group(&acme, "devs", "").unwrap();
    let ops = registry.create_group(&acme, "ops", "").unwrap();

    assert_matches!(
        registry.add_user_to_group(devs.id(), ops.id()),
        Err(HarborError::Invalid { .. })
    );
    assert_matches!(
        registry.add_user_to_group(devs.id(), &acme),
        Err(HarborError::NotFound { .. })
    );
    registry.add_user_to_group(devs.id(), &alice).unwrap();
    assert_matches!(
        registry.add_user_to_group(devs.id(), &alice),
        Err(HarborError::AlreadyExists { .. })
    );
    assert_matches!(
        registry.remove_user_from_group(ops.id(), &alice),
        Err(HarborError::NotFound { .. })
    );
    h.check_invariants();
}

#[test]
fn names_are_unique_in_their_scope() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);
    let (globex, _) = registry
        .register_realm(NewRealm::new("globex"), NewUser::new("hank", "pw"))
        .unwrap();

    assert_matches!(
        registry.create_realm(NewRealm::new("acme"), &alice),
        Err(HarborError::AlreadyExists { .. })
    );
    assert_matches!(
        registry.create_user(globex.id(), NewUser::new("alice", "pw")),
        Err(HarborError::AlreadyExists { .. })
    );

    registry.create_group(&acme, "devs", "").unwrap();
    assert_matches!(
        registry.create_group(&acme, "devs", ""),
        Err(HarborError::AlreadyExists { .. })
    );
    registry.create_group(globex.id(), "devs", "").unwrap();

    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp"))
        .unwrap();
    assert_matches!(
        registry.create_repo(&acme, NewResource::named("webapp")),
        Err(HarborError::AlreadyExists { .. })
    );
    registry
        .create_repo(globex.id(), NewResource::named("webapp"))
        .unwrap();

    registry
        .create_scan_config(webapp.id(), NewScanConfig::new(NewResource::named("nightly"), "trivy"))
        .unwrap();
    assert_matches!(
        registry.create_scan_config(webapp.id(), NewScanConfig::new(NewResource::named("nightly"), "clair")),
        Err(HarborError::AlreadyExists { .. })
    );
    assert_matches!(
        registry.create_repo(&acme, NewResource::named("  ")),
        Err(HarborError::Invalid { .. })
    );
    h.check_invariants();
}

#[test]
fn create_realm_grants_nothing() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);

    let realm = registry
        .create_realm(NewRealm::new("initech").description("TPS reports"), &alice)
        .unwrap();
    assert_eq!(realm.admin_user_id, alice);
    assert!(realm.resource.acl_entry_ids.is_empty());
    assert_eq!(
        realm.file_directory,
        registry.config().realm_directory(realm.id())
    );
    assert!(!h.allowed(&alice, Action::Read, realm.id()));

    assert_matches!(
        registry.create_realm(NewRealm::new("hooli"), &acme),
        Err(HarborError::NotFound { .. })
    );
}

#[test]
fn owned_resources_grant_the_owner() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, _) = acme(&h);
    let carol = registry
        .create_user(&acme, NewUser::new("carol", "pw"))
        .unwrap();
    let repo = registry
        .create_repo(&acme, NewResource::named("infra").owned_by(carol.id()))
        .unwrap();
    assert_eq!(repo.resource.acl_entry_ids.len(), 1);
    let flag = registry
        .create_flag(
            repo.id(),
            NewResource::named("green").owned_by(carol.id()),
            PathBuf::from("/img/green.png"),
        )
        .unwrap();
    assert_eq!(flag.resource.acl_entry_ids.len(), 1);
    assert!(h.allowed(carol.id(), Action::Delete, &flag.resource.id));

    let accessible = h
        .service
        .authorizer()
        .accessible_resources(carol.id())
        .unwrap();
    assert_eq!(accessible.repo_ids, vec![repo.id().clone()]);
    assert_eq!(accessible.leaf_ids, vec![flag.resource.id.clone()]);
    h.check_invariants();
}

#[test]
fn deactivation_cascade() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);
    let bob = registry
        .create_user(&acme, NewUser::new("bob", "pw"))
        .unwrap();
    let devs = registry.create_group(&acme, "devs", "").unwrap();
    registry.add_user_to_group(devs.id(), bob.id()).unwrap();

    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp").owned_by(&alice))
        .unwrap();
    let dockerfile = registry
        .create_dockerfile(
            webapp.id(),
            NewResource::named("Dockerfile1").owned_by(bob.id()),
            PathBuf::from("/src/Dockerfile"),
        )
        .unwrap();
    let flag = registry
        .create_flag(webapp.id(), NewResource::named("ok"), PathBuf::from("/img/ok.png"))
        .unwrap();
    let config = registry
        .create_scan_config(
            webapp.id(),
            NewScanConfig::new(NewResource::named("nightly"), "trivy").flag(&flag.resource.id),
        )
        .unwrap();
    let access = h.service.access();
    access
        .set_access(&flag.resource.id, devs.id(), PermissionMask::FULL)
        .unwrap();
    access
        .set_access(&config.resource.id, bob.id(), PermissionMask::only(Action::Execute))
        .unwrap();

    let summary = registry.deactivate_realm(&acme).unwrap();
    assert_eq!(summary.resources, 5);
    assert_eq!(summary.revoked_entries, 5);
    assert_eq!(summary.deactivated_parties, 3);

    let view = h.fx.store().view();
    for id in [
        &acme,
        webapp.id(),
        &dockerfile.resource.id,
        &flag.resource.id,
        &config.resource.id,
    ] {
        assert!(view.resource(id).unwrap().acl_entry_ids.is_empty(), "{id} kept entries");
    }
    for id in [&alice, bob.id(), devs.id()] {
        let party = view.party(id).unwrap();
        assert!(!party.is_active);
        assert!(party.acl_entry_ids.is_empty());
    }
    // Deactivated records stay in the store
    assert!(view.contains(devs.id()));
    drop(view);

    assert_matches!(
        h.service.sessions().login(&Credentials::new("alice", "s3cret")),
        Err(HarborError::Unauthorized { .. })
    );
    h.check_invariants();
}

#[test]
fn deactivation_ends_sessions_opened_before_it() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, _alice) = acme(&h);
    let bob = registry
        .create_user(&acme, NewUser::new("bob", "pw"))
        .unwrap();
    let (globex, _carol) = registry
        .register_realm(NewRealm::new("globex"), NewUser::new("carol", "pw"))
        .unwrap();
    let shared = registry
        .create_repo(globex.id(), NewResource::named("shared"))
        .unwrap();
    h.service
        .access()
        .set_access(shared.id(), bob.id(), PermissionMask::only(Action::Read))
        .unwrap();

    let token = h
        .service
        .sessions()
        .login(&Credentials::new("bob", "pw"))
        .unwrap();
    assert!(h
        .service
        .authorize_session(&token.session_id, Action::Write, bob.id())
        .is_ok());
    assert!(h
        .service
        .authorize_session(&token.session_id, Action::Read, shared.id())
        .is_ok());

    registry.deactivate_realm(&acme).unwrap();

    assert_matches!(
        h.service.sessions().authenticate(&token.session_id),
        Err(HarborError::Unauthorized { .. })
    );
    assert_matches!(
        h.service
            .authorize_session(&token.session_id, Action::Write, bob.id()),
        Err(HarborError::Unauthorized { .. })
    );
    // The grant outside the realm is still stored but no longer usable
    assert_matches!(
        h.service
            .authorize_session(&token.session_id, Action::Read, shared.id()),
        Err(HarborError::Unauthorized { .. })
    );
    h.check_invariants();
}

#[test]
fn delete_group_unwinds_members_and_grants() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);
    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp"))
        .unwrap();
    let devs = registry.create_group(&acme, "devs", "").unwrap();
    registry.add_user_to_group(devs.id(), &alice).unwrap();
    h.service
        .access()
        .set_access(webapp.id(), devs.id(), PermissionMask::FULL)
        .unwrap();
    h.service
        .access()
        .set_access(&acme, devs.id(), PermissionMask::only(Action::Read))
        .unwrap();

    registry.delete_group(devs.id()).unwrap();

    let view = h.fx.store().view();
    assert!(!view.contains(devs.id()));
    assert!(view.user(&alice).unwrap().group_ids.is_empty());
    assert!(view.realm(&acme).unwrap().group_ids.is_empty());
    assert!(view.repo(webapp.id()).unwrap().resource.acl_entry_ids.is_empty());
    // alice's own full-mask entry on the realm survives
    assert_eq!(view.realm(&acme).unwrap().resource.acl_entry_ids.len(), 1);
    drop(view);
    h.check_invariants();

    assert_matches!(
        registry.delete_group(devs.id()),
        Err(HarborError::NotFound { .. })
    );
}

#[test]
fn flags_and_scan_configs_stay_linked() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, _) = acme(&h);
    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp"))
        .unwrap();
    let green = registry
        .create_flag(webapp.id(), NewResource::named("green"), PathBuf::from("/img/g.png"))
        .unwrap();
    let amber = registry
        .create_flag(webapp.id(), NewResource::named("amber"), PathBuf::from("/img/a.png"))
        .unwrap();
    let config = registry
        .create_scan_config(
            webapp.id(),
            NewScanConfig::new(NewResource::named("nightly"), "trivy")
                .success_expression("critical == 0")
                .flag(&green.resource.id)
                .parameter("severity", "HIGH"),
        )
        .unwrap();
    let config_id = config.resource.id.clone();
    assert_eq!(config.parameter_value_ids.len(), 1);

    assert_matches!(
        registry.delete_flag(&green.resource.id),
        Err(HarborError::Conflict { .. })
    );

    let updated = registry
        .update_scan_config(
            &config_id,
            ScanConfigPatch::new()
                .name("hourly")
                .flag(Some(&amber.resource.id))
                .parameters(vec![
                    ("severity".to_string(), "CRITICAL".to_string()),
                    ("timeout".to_string(), "60".to_string()),
                ]),
        )
        .unwrap();
    assert_eq!(updated.resource.name, "hourly");
    assert_eq!(updated.flag_id.as_ref(), Some(&amber.resource.id));
    assert_eq!(updated.parameter_value_ids.len(), 2);
    {
        let view = h.fx.store().view();
        assert!(view.flag(&green.resource.id).unwrap().used_by_scan_config_ids.is_empty());
        assert_eq!(
            view.flag(&amber.resource.id).unwrap().used_by_scan_config_ids,
            vec![config_id.clone()]
        );
        for old in &config.parameter_value_ids {
            assert!(!view.contains(old));
        }
    }

    registry.delete_flag(&green.resource.id).unwrap();
    registry.delete_scan_config(&config_id).unwrap();
    {
        let view = h.fx.store().view();
        assert!(view.flag(&amber.resource.id).unwrap().used_by_scan_config_ids.is_empty());
        for parameter in &updated.parameter_value_ids {
            assert!(!view.contains(parameter));
        }
        assert_eq!(view.repo(webapp.id()).unwrap().flag_ids, vec![amber.resource.id.clone()]);
    }
    h.check_invariants();
}

#[test]
fn failed_create_leaves_no_trace() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, _) = acme(&h);
    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp"))
        .unwrap();
    let api = registry.create_repo(&acme, NewResource::named("api")).unwrap();
    let foreign = registry
        .create_flag(api.id(), NewResource::named("green"), PathBuf::from("/img/g.png"))
        .unwrap();
    let before = h.fx.store().snapshot().len();

    assert_matches!(
        registry.create_scan_config(
            webapp.id(),
            NewScanConfig::new(NewResource::named("nightly"), "trivy")
                .parameter("severity", "HIGH")
                .flag(&foreign.resource.id),
        ),
        Err(HarborError::Invalid { .. })
    );
    assert_eq!(h.fx.store().snapshot().len(), before);
    assert!(h
        .fx
        .store()
        .view()
        .repo(webapp.id())
        .unwrap()
        .scan_config_ids
        .is_empty());
}

#[test]
fn delete_repo_cascades_to_children() {
    let h = harbor();
    let registry = h.service.registry();
    let (acme, alice) = acme(&h);
    let webapp = registry
        .create_repo(&acme, NewResource::named("webapp").owned_by(&alice))
        .unwrap();
    let flag = registry
        .create_flag(webapp.id(), NewResource::named("ok"), PathBuf::from("/img/ok.png"))
        .unwrap();
    let config = registry
        .create_scan_config(
            webapp.id(),
            NewScanConfig::new(NewResource::named("nightly").owned_by(&alice), "trivy")
                .flag(&flag.resource.id)
                .parameter("severity", "HIGH"),
        )
        .unwrap();
    let image = registry
        .create_docker_image(webapp.id(), NewResource::named("webapp:1"), "sha256:abc", "")
        .unwrap();
    let dockerfile = registry
        .create_dockerfile(webapp.id(), NewResource::named("Dockerfile"), PathBuf::from("/src/D"))
        .unwrap();

    registry.delete_repo(webapp.id()).unwrap();

    let view = h.fx.store().view();
    for id in [
        webapp.id(),
        &flag.resource.id,
        &config.resource.id,
        &image.resource.id,
        &dockerfile.resource.id,
        &config.parameter_value_ids[0],
    ] {
        assert!(!view.contains(id), "{id} survived");
    }
    assert!(view.realm(&acme).unwrap().repo_ids.is_empty());
    assert_eq!(view.user(&alice).unwrap().party.acl_entry_ids.len(), 1);
    drop(view);
    h.check_invariants();

    // Deleted ids are never handed out again
    let after = registry.create_repo(&acme, NewResource::named("webapp")).unwrap();
    assert_ne!(after.id(), webapp.id());
}
