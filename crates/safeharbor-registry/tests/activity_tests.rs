//! Builds and scans recorded through the registry

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use safeharbor_authentication::SessionConfig;
use safeharbor_core::{Action, HarborError, ObjectId, PermissionMask, Result};
use safeharbor_registry::{
    BuildTool, HarborService, NewRealm, NewResource, NewScanConfig, NewUser, SavedImage,
    ScanProvider, ServiceConfig, Vulnerability,
};
use safeharbor_store::EntitySource;
use safeharbor_testkit::{assert_acl_index_consistent, init_test_tracing, Fixture};
use std::path::{Path, PathBuf};

#[derive(Default)]
struct FakeBuilder {
    builds: Mutex<Vec<(PathBuf, String)>>,
    fail: bool,
}

#[async_trait]
impl BuildTool for FakeBuilder {
    async fn build(&self, dockerfile_path: &Path, tag: &str) -> Result<String> {
        if self.fail {
            return Err(HarborError::internal("docker daemon unreachable"));
        }
        self.builds
            .lock()
            .push((dockerfile_path.to_path_buf(), tag.to_string()));
        Ok(format!("Successfully tagged {tag}"))
    }

    async fn save(&self, image_ref: &str) -> Result<SavedImage> {
        Ok(SavedImage {
            path: PathBuf::from(format!("/tmp/{image_ref}.tar")),
            signature: format!("sha256:{image_ref}"),
        })
    }
}

struct FakeScanner {
    seen: Mutex<Vec<Vec<(String, String)>>>,
}

#[async_trait]
impl ScanProvider for FakeScanner {
    fn name(&self) -> &str {
        "trivy"
    }

    async fn scan(&self, _image_ref: &str, params: &[(String, String)]) -> Result<Vec<Vulnerability>> {
        self.seen.lock().push(params.to_vec());
        Ok(vec![
            Vulnerability {
                id: "CVE-2024-0001".to_string(),
                severity: "medium".to_string(),
                score: 5.3,
            },
            Vulnerability {
                id: "CVE-2024-0002".to_string(),
                severity: "critical".to_string(),
                score: 9.8,
            },
        ])
    }
}

fn scanner() -> FakeScanner {
    FakeScanner {
        seen: Mutex::new(Vec::new()),
    }
}

struct World {
    fx: Fixture,
    service: HarborService,
    alice: ObjectId,
    bob: ObjectId,
    repo: ObjectId,
    dockerfile: ObjectId,
    config: ObjectId,
}

fn world() -> World {
    init_test_tracing();
    let fx = Fixture::new();
    let config = ServiceConfig {
        session: SessionConfig::with_salt("activity-tests"),
        ..ServiceConfig::default()
    };
    let service = HarborService::with_store(config, fx.store().clone(), fx.clock().clone()).unwrap();
    let registry = service.registry();
    let (acme, alice) = registry
        .register_realm(NewRealm::new("acme"), NewUser::new("alice", "pw"))
        .unwrap();
    let bob = registry
        .create_user(acme.id(), NewUser::new("bob", "pw"))
        .unwrap();
    let repo = registry
        .create_repo(acme.id(), NewResource::named("webapp").owned_by(alice.id()))
        .unwrap();
    let dockerfile = registry
        .create_dockerfile(
            repo.id(),
            NewResource::named("Dockerfile1").owned_by(alice.id()),
            PathBuf::from("/src/webapp/Dockerfile"),
        )
        .unwrap();
    let config = registry
        .create_scan_config(
            repo.id(),
            NewScanConfig::new(NewResource::named("nightly").owned_by(alice.id()), "trivy")
                .parameter("severity", "HIGH"),
        )
        .unwrap();
    World {
        alice: alice.id().clone(),
        bob: bob.id().clone(),
        repo: repo.id().clone(),
        dockerfile: dockerfile.resource.id.clone(),
        config: config.resource.id.clone(),
        fx,
        service,
    }
}

#[tokio::test]
async fn build_records_image_and_event() {
    let w = world();
    let builder = FakeBuilder::default();
    let (image, event) = w
        .service
        .registry()
        .exec_dockerfile(&w.alice, &w.dockerfile, "webapp:1", &builder)
        .await
        .unwrap();

    assert_eq!(
        builder.builds.lock().clone(),
        vec![(PathBuf::from("/src/webapp/Dockerfile"), "webapp:1".to_string())]
    );
    assert_eq!(image.resource.parent_id.as_ref(), Some(&w.repo));
    assert_eq!(image.content_signature, "sha256:webapp:1");
    assert_eq!(image.build_output, "Successfully tagged webapp:1");
    assert_eq!(image.build_event_id.as_ref(), Some(&event.id));
    assert_eq!(event.docker_image_id.as_ref(), Some(&image.resource.id));

    let view = w.fx.store().view();
    assert!(view.repo(&w.repo).unwrap().docker_image_ids.contains(&image.resource.id));
    assert_eq!(view.dockerfile(&w.dockerfile).unwrap().exec_event_ids, vec![event.id.clone()]);
    assert_eq!(view.user(&w.alice).unwrap().event_ids, vec![event.id.clone()]);
    drop(view);
    assert!(w
        .service
        .authorizer()
        .authorize(&w.alice, Action::Delete, &image.resource.id)
        .unwrap()
        .is_allowed());
    assert_acl_index_consistent(w.fx.store());
}

#[tokio::test]
async fn build_requires_execute() {
    let w = world();
    let builder = FakeBuilder::default();
    let registry = w.service.registry();
    assert_matches!(
        registry
            .exec_dockerfile(&w.bob, &w.dockerfile, "webapp:1", &builder)
            .await,
        Err(HarborError::Forbidden { .. })
    );
    assert!(builder.builds.lock().is_empty());

    w.service
        .access()
        .set_access(&w.dockerfile, &w.bob, PermissionMask::only(Action::Execute))
        .unwrap();
    assert!(registry
        .exec_dockerfile(&w.bob, &w.dockerfile, "webapp:1", &builder)
        .await
        .is_ok());
}

#[tokio::test]
async fn failed_build_records_nothing() {
    let w = world();
    let builder = FakeBuilder {
        fail: true,
        ..FakeBuilder::default()
    };
    let before = w.fx.store().snapshot().len();
    assert_matches!(
        w.service
            .registry()
            .exec_dockerfile(&w.alice, &w.dockerfile, "webapp:1", &builder)
            .await,
        Err(HarborError::Internal { .. })
    );
    assert_eq!(w.fx.store().snapshot().len(), before);
}

#[tokio::test]
async fn scan_records_event_everywhere() {
    let w = world();
    let registry = w.service.registry();
    let (image, _) = registry
        .exec_dockerfile(&w.alice, &w.dockerfile, "webapp:1", &FakeBuilder::default())
        .await
        .unwrap();
    let scanner = scanner();
    let event = registry
        .scan_image(&w.alice, &w.config, &image.resource.id, &scanner)
        .await
        .unwrap();

    assert_eq!(
        scanner.seen.lock().clone(),
        vec![vec![("severity".to_string(), "HIGH".to_string())]]
    );
    assert_eq!(event.vulnerability_count, 2);
    assert_eq!(event.score, 9.8);
    assert_eq!(event.provider_name, "trivy");

    let view = w.fx.store().view();
    let image = view.docker_image(&image.resource.id).unwrap();
    assert_eq!(image.latest_scan_event_id(), Some(&event.id));
    assert_eq!(view.scan_config(&w.config).unwrap().scan_event_ids, vec![event.id.clone()]);
    assert_eq!(view.user(&w.alice).unwrap().event_ids.len(), 2);
}

#[tokio::test]
async fn scan_checks_caller_and_provider() {
    let w = world();
    let registry = w.service.registry();
    let (image, _) = registry
        .exec_dockerfile(&w.alice, &w.dockerfile, "webapp:1", &FakeBuilder::default())
        .await
        .unwrap();

    assert_matches!(
        registry
            .scan_image(&w.bob, &w.config, &image.resource.id, &scanner())
            .await,
        Err(HarborError::Forbidden { .. })
    );

    w.service
        .registry()
        .update_scan_config(
            &w.config,
            safeharbor_registry::ScanConfigPatch::new().provider_name("clair"),
        )
        .unwrap();
    let scanner = scanner();
    assert_matches!(
        registry
            .scan_image(&w.alice, &w.config, &image.resource.id, &scanner)
            .await,
        Err(HarborError::Invalid { .. })
    );
    assert!(scanner.seen.lock().is_empty());
}

#[tokio::test]
async fn history_blocks_deletion_and_outlives_resources() {
    let w = world();
    let registry = w.service.registry();
    let (image, build) = registry
        .exec_dockerfile(&w.alice, &w.dockerfile, "webapp:1", &FakeBuilder::default())
        .await
        .unwrap();
    let scan = registry
        .scan_image(&w.alice, &w.config, &image.resource.id, &scanner())
        .await
        .unwrap();

    assert_matches!(registry.delete_scan_config(&w.config), Err(HarborError::Conflict { .. }));
    assert_matches!(registry.delete_repo(&w.repo), Err(HarborError::Conflict { .. }));

    registry.delete_docker_image(&image.resource.id).unwrap();
    registry.delete_dockerfile(&w.dockerfile).unwrap();

    let view = w.fx.store().view();
    let scan = view.scan_event(&scan.id).unwrap();
    assert_eq!(scan.docker_image_id, None);
    assert_eq!(scan.scan_config_id.as_ref(), Some(&w.config));
    let build = view.exec_event(&build.id).unwrap();
    assert_eq!(build.docker_image_id, None);
    assert_eq!(build.dockerfile_id, None);
    assert!(view.repo(&w.repo).unwrap().docker_image_ids.is_empty());
    drop(view);
    assert_acl_index_consistent(w.fx.store());
}
