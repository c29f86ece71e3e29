//! ARM REST client against a mocked Resource Manager.
//!
//! Covers decoding, error mapping and the three ways ARM reports the
//! progress of a long-running operation.

use std::time::Duration;

use azurerm_provider::client::models::{P2sVpnGateway, PrivateEndpoint};
use azurerm_provider::client::{ApiError, ArmClient, Clients};
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUB: &str = "00000000-0000-0000-0000-000000000000";
const PE_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/privateEndpoints/pe";
const GW_PATH: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/p2sVpnGateways/gw";

fn clients(server: &MockServer) -> Clients {
    let client = ArmClient::new(server.uri(), SUB, "test-token")
        .unwrap()
        .with_poll_interval(Duration::from_millis(10));
    Clients::arm(client)
}

#[tokio::test]
async fn test_get_decodes_resource() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PE_PATH))
        .and(query_param("api-version", "2019-06-01"))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": PE_PATH,
            "name": "pe",
            "location": "westeurope",
            "properties": {
                "subnet": {"id": "subnet-id"},
                "networkInterfaces": [{"id": "nic-id"}],
                "privateLinkServiceConnections": [{
                    "name": "conn",
                    "properties": {
                        "privateLinkServiceId": "pls-id",
                        "requestMessage": "Please approve my connection."
                    }
                }],
                "provisioningState": "Succeeded"
            }
        })))
        .mount(&server)
        .await;

    let endpoint = clients(&server).private_endpoints.get("rg", "pe").await.unwrap();
    assert_eq!(endpoint.id.as_deref(), Some(PE_PATH));
    let props = endpoint.properties.unwrap();
    assert_eq!(props.subnet.unwrap().id.as_deref(), Some("subnet-id"));
    let conns = props.private_link_service_connections.unwrap();
    assert_eq!(conns[0].name.as_deref(), Some("conn"));
    assert!(conns[0].properties.as_ref().unwrap().group_ids.is_none());
}

#[tokio::test]
async fn test_get_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GW_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "ResourceNotFound",
                "message": "The Resource 'Microsoft.Network/p2sVpnGateways/gw' under resource group 'rg' was not found."
            }
        })))
        .mount(&server)
        .await;

    let err = clients(&server).p2s_vpn_gateways.get("rg", "gw").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, ApiError::Status { ref code, .. } if code == "ResourceNotFound"));
}

#[tokio::test]
async fn test_error_body_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(GW_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "InvalidResourceReference",
                "message": "Resource /hub referenced by resource gw was not found."
            }
        })))
        .mount(&server)
        .await;

    let err = clients(&server)
        .p2s_vpn_gateways
        .create_or_update("rg", "gw", &P2sVpnGateway::default())
        .await
        .err()
        .unwrap();
    match err {
        ApiError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, "InvalidResourceReference");
            assert!(message.contains("referenced by resource gw"));
        },
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_body_that_is_not_json_keeps_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(GW_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = clients(&server).p2s_vpn_gateways.get("rg", "gw").await.unwrap_err();
    assert_eq!(err.status_code(), Some(502));
    assert!(err.to_string().contains("Bad Gateway"));
}

#[tokio::test]
async fn test_put_polls_azure_async_operation() {
    let server = MockServer::start().await;
    let operation_url = format!("{}/operations/op-1", server.uri());

    Mock::given(method("PUT"))
        .and(path(GW_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", operation_url.as_str())
                .insert_header("Retry-After", "0")
                .set_body_json(json!({"properties": {"provisioningState": "Updating"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;

    let op = clients(&server)
        .p2s_vpn_gateways
        .create_or_update("rg", "gw", &P2sVpnGateway::default())
        .await
        .unwrap();
    op.wait().await.unwrap();
}

#[tokio::test]
async fn test_failed_async_operation_reports_message() {
    let server = MockServer::start().await;
    let operation_url = format!("{}/operations/op-2", server.uri());

    Mock::given(method("PUT"))
        .and(path(PE_PATH))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation_url.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "SubnetNotFound", "message": "Subnet endpoint was not found."}
        })))
        .mount(&server)
        .await;

    let op = clients(&server)
        .private_endpoints
        .create_or_update("rg", "pe", &PrivateEndpoint::default())
        .await
        .unwrap();
    let err = op.wait().await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::OperationFailed { ref status, ref message }
            if status == "Failed" && message == "Subnet endpoint was not found."
    ));
}

#[tokio::test]
async fn test_put_polls_provisioning_state() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(PE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"properties": {"provisioningState": "Updating"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"properties": {"provisioningState": "Succeeded"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let op = clients(&server)
        .private_endpoints
        .create_or_update("rg", "pe", &PrivateEndpoint::default())
        .await
        .unwrap();
    op.wait().await.unwrap();
}

#[tokio::test]
async fn test_delete_polls_location() {
    let server = MockServer::start().await;
    let location = format!("{}/operationResults/del-1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(PE_PATH))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", location.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationResults/del-1"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationResults/del-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let op = clients(&server).private_endpoints.delete("rg", "pe").await.unwrap();
    op.wait().await.unwrap();
}

#[tokio::test]
async fn test_delete_204_completes_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(GW_PATH))
        .and(query_param("api-version", "2019-06-01"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let op = clients(&server).p2s_vpn_gateways.delete("rg", "gw").await.unwrap();
    op.wait().await.unwrap();
}

#[tokio::test]
async fn test_data_source_lookups_use_their_own_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{}/resourceGroups/demo", SUB)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": format!("/subscriptions/{}/resourceGroups/demo", SUB),
            "name": "demo",
            "location": "westeurope",
            "tags": {"env": "test"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/subscriptions/{}/resourceGroups/demo/providers/Microsoft.Automation/automationAccounts/acct/variables/flag",
            SUB
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "flag",
            "properties": {"value": "true", "isEncrypted": false}
        })))
        .mount(&server)
        .await;

    let clients = clients(&server);
    let group = clients.resource_groups.get("demo").await.unwrap();
    assert_eq!(group.tags.unwrap()["env"], "test");

    let variable = clients
        .automation_variables
        .get("demo", "acct", "flag")
        .await
        .unwrap();
    let props = variable.properties.unwrap();
    assert_eq!(props.value.as_deref(), Some("true"));
    assert_eq!(props.is_encrypted, Some(false));
}
