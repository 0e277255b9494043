//! Tests for ChaincodeService

use std::sync::Arc;

use rstest::rstest;

use fabric_cli_ext::application::services::{
    ApproveOptions, ChaincodeService, CommitOptions, InstantiateOptions, LifecycleOptions,
    MSG_CC_APPROVED, MSG_CC_COMMITTED, MSG_CC_INSTANTIATED,
};
use fabric_cli_ext::config::Settings;
use fabric_cli_ext::domain::{CollectionType, PolicyRule, SignaturePolicy};
use fabric_cli_ext::util::testing::{
    init_test_setup, test_settings, LifecycleCall, MockFactory, MockTerminal, TEST_CHANNEL,
    TEST_PEERS,
};

const COLLECTIONS: &str = r#"[
  {"name":"coll1","type":"COL_DCAS","policy":"OR('Org1MSP.member','Org2MSP.member')","requiredPeerCount":1,"maxPeerCount":2,"timeToLive":"10m"},
  {"name":"coll2","type":"COL_OFFLEDGER","policy":"OR('IMPLICIT-ORG.member')"}
]"#;

struct Fixture {
    factory: Arc<MockFactory>,
    term: Arc<MockTerminal>,
    service: ChaincodeService,
}

fn fixture_with(settings: Settings) -> Fixture {
    init_test_setup();
    let factory = Arc::new(MockFactory::new());
    let term = Arc::new(MockTerminal::new());
    let service = ChaincodeService::new(Arc::new(settings), factory.clone(), term.clone());
    Fixture {
        factory,
        term,
        service,
    }
}

fn fixture() -> Fixture {
    fixture_with(test_settings())
}

fn lifecycle(sequence: &str) -> LifecycleOptions {
    LifecycleOptions {
        name: "mycc".into(),
        version: "v1".into(),
        sequence: sequence.into(),
        policy: "AND('Org1MSP.member','Org2MSP.member')".into(),
        collections_config: COLLECTIONS.into(),
        ..Default::default()
    }
}

fn context_peers() -> Vec<String> {
    TEST_PEERS.iter().map(|p| p.to_string()).collect()
}

// ============================================================
// instantiatecc
// ============================================================

#[test]
fn given_collections_when_instantiate_then_sends_typed_collections_to_context_peers() {
    // Arrange
    let f = fixture();

    // Act
    f.service
        .instantiate(&InstantiateOptions {
            name: "mycc".into(),
            version: "v1".into(),
            policy: String::new(),
            collections_config: COLLECTIONS.into(),
        })
        .unwrap();

    // Assert
    let calls = f.factory.res_mgmt.calls();
    assert_eq!(calls.len(), 1);
    let LifecycleCall::Instantiate {
        channel,
        request,
        targets,
    } = &calls[0]
    else {
        panic!("expected instantiate, got {:?}", calls[0]);
    };
    assert_eq!(channel, TEST_CHANNEL);
    assert_eq!(targets, &context_peers());
    assert_eq!(request.policy, SignaturePolicy::accept_all());
    assert_eq!(request.collection_config.len(), 2);
    assert_eq!(request.collection_config[0].collection_type, CollectionType::ColDcas);
    assert_eq!(request.collection_config[0].maximum_peer_count, 2);
    assert_eq!(request.collection_config[0].time_to_live, "10m");
    assert_eq!(
        request.collection_config[1].collection_type,
        CollectionType::ColOffledger
    );
    assert_eq!(f.term.output(), format!("{MSG_CC_INSTANTIATED}\n"));
}

#[rstest]
#[case::no_name(InstantiateOptions::default(), "chaincode name not specified")]
#[case::no_version(
    InstantiateOptions { name: "mycc".into(), ..Default::default() },
    "chaincode version not specified"
)]
#[case::bad_policy(
    InstantiateOptions { name: "mycc".into(), version: "v1".into(), policy: "NOT('x')".into(), ..Default::default() },
    "error parsing chaincode policy"
)]
fn given_bad_args_when_instantiate_then_no_lifecycle_call(
    #[case] opts: InstantiateOptions,
    #[case] expected: &str,
) {
    let f = fixture();

    let err = f.service.instantiate(&opts).unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert!(f.factory.res_mgmt.calls().is_empty());
}

#[test]
fn given_invalid_collection_policy_when_instantiate_then_policy_error() {
    let f = fixture();

    let err = f
        .service
        .instantiate(&InstantiateOptions {
            name: "mycc".into(),
            version: "v1".into(),
            collections_config: r#"[{"name":"c1","type":"COL_PRIVATE","policy":"garbage"}]"#
                .into(),
            ..Default::default()
        })
        .unwrap_err();

    assert!(err.to_string().starts_with("invalid policy [garbage]"), "{err}");
    assert!(f.factory.res_mgmt.calls().is_empty());
}

#[test]
fn given_no_current_context_when_instantiate_then_config_error() {
    let f = fixture_with(Settings::default());

    let err = f
        .service
        .instantiate(&InstantiateOptions {
            name: "mycc".into(),
            version: "v1".into(),
            ..Default::default()
        })
        .unwrap_err();

    assert!(err.to_string().starts_with("config error:"), "{err}");
}

// ============================================================
// approvecc
// ============================================================

#[test]
fn given_valid_args_when_approve_then_builds_full_request() {
    let f = fixture();
    let opts = ApproveOptions {
        package_id: "mycc_v1:abc123".into(),
        lifecycle: LifecycleOptions {
            init_required: true,
            channel_config_policy: "/Channel/Application/Endorsement".into(),
            endorsement_plugin: "escc".into(),
            validation_plugin: "vscc".into(),
            ..lifecycle("2")
        },
    };

    f.service.approve(&opts).unwrap();

    let calls = f.factory.res_mgmt.calls();
    let LifecycleCall::Approve {
        channel,
        request,
        targets,
    } = &calls[0]
    else {
        panic!("expected approve, got {:?}", calls[0]);
    };
    assert_eq!(channel, TEST_CHANNEL);
    assert_eq!(targets, &context_peers());
    assert_eq!(request.package_id, "mycc_v1:abc123");
    assert_eq!(request.sequence, 2);
    assert!(request.init_required);
    assert_eq!(request.channel_config_policy, "/Channel/Application/Endorsement");
    assert_eq!(request.endorsement_plugin, "escc");
    assert_eq!(request.validation_plugin, "vscc");
    assert_eq!(request.signature_policy.identities.len(), 2);
    assert!(matches!(
        request.signature_policy.rule,
        PolicyRule::NOutOf { n: 2, .. }
    ));
    assert_eq!(f.term.output(), format!("{MSG_CC_APPROVED}\n"));
}

#[rstest]
#[case::no_package_id("", "1", "package ID not specified")]
#[case::no_sequence("pkg", "", "sequence not specified")]
#[case::zero_sequence("pkg", "0", "sequence must be greater than 0")]
fn given_bad_args_when_approve_then_validation_error(
    #[case] package_id: &str,
    #[case] sequence: &str,
    #[case] expected: &str,
) {
    let f = fixture();

    let err = f
        .service
        .approve(&ApproveOptions {
            package_id: package_id.into(),
            lifecycle: lifecycle(sequence),
        })
        .unwrap_err();

    assert_eq!(err.to_string(), expected);
    assert!(f.factory.res_mgmt.calls().is_empty());
}

#[test]
fn given_non_numeric_sequence_when_approve_then_invalid_sequence() {
    let f = fixture();

    let err = f
        .service
        .approve(&ApproveOptions {
            package_id: "pkg".into(),
            lifecycle: lifecycle("abc"),
        })
        .unwrap_err();

    assert!(err.to_string().starts_with("invalid sequence"), "{err}");
}

// ============================================================
// commitcc
// ============================================================

#[test]
fn given_explicit_peers_when_commit_then_targets_those_peers() {
    let f = fixture();

    f.service
        .commit(&CommitOptions {
            peers: vec!["peer0.org2.example.com".into()],
            lifecycle: lifecycle("1"),
        })
        .unwrap();

    let calls = f.factory.res_mgmt.calls();
    let LifecycleCall::Commit {
        request, targets, ..
    } = &calls[0]
    else {
        panic!("expected commit, got {:?}", calls[0]);
    };
    assert_eq!(targets, &vec!["peer0.org2.example.com".to_string()]);
    assert_eq!(request.sequence, 1);
    assert_eq!(f.term.output(), format!("{MSG_CC_COMMITTED}\n"));
}

#[test]
fn given_no_peers_when_commit_then_targets_context_peers() {
    let f = fixture();

    f.service
        .commit(&CommitOptions {
            peers: vec![],
            lifecycle: lifecycle("1"),
        })
        .unwrap();

    let calls = f.factory.res_mgmt.calls();
    let LifecycleCall::Commit { targets, .. } = &calls[0] else {
        panic!("expected commit, got {:?}", calls[0]);
    };
    assert_eq!(targets, &context_peers());
}

#[test]
fn given_lifecycle_failure_when_commit_then_error_and_no_success_message() {
    let f = fixture();
    f.factory.res_mgmt.fail_with("commit rejected");

    let err = f
        .service
        .commit(&CommitOptions {
            peers: vec![],
            lifecycle: lifecycle("1"),
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "commit rejected");
    assert_eq!(f.term.output(), "");
}
