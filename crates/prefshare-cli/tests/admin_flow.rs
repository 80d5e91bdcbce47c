//! Admin login and dashboard against a mock backend.


use fixtures::{can_bind_localhost, prefshare, read_credentials, temp_home, write_credentials};
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_city(server: &MockServer, ip: &str, city: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/json/{ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cityName": city})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_admin_login_stores_admin_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/admin/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success", "token": "adm-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    prefshare(home.path(), &server)
        .args(["admin", "login", "--username", "root", "--password", "pw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next: /admin/dashboard"));

    let creds = read_credentials(home.path());
    assert_eq!(creds["adminToken"], "adm-1");
    assert!(creds.get("jwt").is_none());
}

#[tokio::test]
async fn test_dashboard_renders_sections_with_unknown_bucket() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    write_credentials(home.path(), &json!({"adminToken": "adm"}));

    Mock::given(method("GET"))
        .and(path("/api/v1/admin/users"))
        .and(header("authorization", "Bearer adm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"users": [{
                "_id": "u1",
                "name": "Ann",
                "email": "ann@example.com",
                "phone": "",
                "permissions": {"email": true}
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/get-username/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ann"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/audit-logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user": "u1",
            "action": "delete",
            "field": "phone",
            "timestamp": "2024-05-01T10:00:00Z",
            "ipAddress": "10.0.0.1"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/user-ips"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["10.0.0.1", "10.0.0.2", "10.0.0.3"])),
        )
        .mount(&server)
        .await;
    mount_city(&server, "10.0.0.1", "Lisbon").await;
    mount_city(&server, "10.0.0.2", "Lisbon").await;
    mount_city(&server, "10.0.0.3", "-").await;

    prefshare(home.path(), &server)
        .args(["admin", "dashboard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Users (1)"))
        .stdout(predicate::str::contains("ann"))
        .stdout(predicate::str::contains("ann@example.com"))
        .stdout(predicate::str::contains("N/A"))
        .stdout(predicate::str::contains("2024-05-01 10:00:00 UTC"))
        .stdout(predicate::str::contains("Locations (3 IPs)"))
        .stdout(predicate::str::contains("Lisbon"))
        .stdout(predicate::str::contains("Unknown"))
        .stdout(predicate::str::contains("66.7%"));
}

#[tokio::test]
async fn test_dashboard_degrades_when_a_section_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let server = MockServer::start().await;
    write_credentials(home.path(), &json!({"adminToken": "adm"}));

    Mock::given(method("GET"))
        .and(path("/api/v1/admin/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/audit-logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/user-ips"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    prefshare(home.path(), &server)
        .args(["admin", "dashboard"])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: Users unavailable"))
        .stdout(predicate::str::contains("Users (0)"));
}
