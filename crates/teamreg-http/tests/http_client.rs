// Integration tests for the reqwest adapter against a local mock server.
//
// Each test binds a TcpListener, answers exactly one request with a canned
// response, and hands the raw request text back for inspection.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use teamreg_core::api::{LeagueApi, MultipartForm, PlayerUpdate};
use teamreg_core::error::ApiError;
use teamreg_core::photo::ChosenFile;
use teamreg_core::session::SessionContext;
use teamreg_http::HttpLeagueApi;

// ===========================================================================
// Mock server
// ===========================================================================

/// Serve one request with `status_line` and a JSON `body`. The handle
/// resolves to the request as received.
async fn serve_once(status_line: &'static str, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        request
    });

    (addr, handle)
}

/// Read headers, then as many body bytes as `Content-Length` announces.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = find(&buf, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= header_end + 4 + length {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn api(addr: SocketAddr) -> HttpLeagueApi {
    HttpLeagueApi::new(format!("http://{addr}/api"))
}

fn session() -> SessionContext {
    SessionContext::new("jwt-123")
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn validate_invitation_posts_code_with_bearer() {
    let (addr, server) = serve_once(
        "200 OK",
        r#"{"status":"success","msg":"","data":{"season":{"_id":"s-9","name":"Apertura"}}}"#,
    )
    .await;

    let season = api(addr).validate_invitation(&session(), "VALID123").await.unwrap();
    assert_eq!(season.id, "s-9");
    assert_eq!(season.name.as_deref(), Some("Apertura"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/invitation/validate "));
    assert!(request.to_lowercase().contains("authorization: bearer jwt-123"));
    assert!(request.contains(r#"{"code":"VALID123"}"#));
}

#[tokio::test]
async fn anonymous_session_sends_no_authorization() {
    let (addr, server) = serve_once("200 OK", r#"{"status":"success","msg":"","data":[]}"#).await;

    let players = api(addr)
        .players_by_team(&SessionContext::anonymous(), "team-1")
        .await
        .unwrap();
    assert!(players.is_empty());

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/players/team/team-1 "));
    assert!(!request.to_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn rejected_invitation_keeps_server_message() {
    let (addr, server) = serve_once(
        "404 Not Found",
        r#"{"status":"error","msg":"Invitación expirada"}"#,
    )
    .await;

    let err = api(addr).validate_invitation(&session(), "OLD1").await.unwrap_err();
    assert_eq!(err.server_message(), Some("Invitación expirada"));
    let _ = server.await;
}

#[tokio::test]
async fn unauthorized_maps_to_unauthorized() {
    let (addr, server) = serve_once("401 Unauthorized", r#"{"status":"error","msg":"Token inválido"}"#).await;

    let err = api(addr)
        .add_team_to_season(&session(), "team-1", "SEASON26")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Unauthorized {
            message: Some("Token inválido".into())
        }
    );

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/teams/team-1/season "));
}

#[tokio::test]
async fn create_player_sends_multipart_and_reads_id() {
    let (addr, server) = serve_once(
        "201 Created",
        r#"{"status":"success","msg":"Jugador creado","data":{"_id":"p-77"}}"#,
    )
    .await;

    let photo = ChosenFile::new("ana.png", "image/png", b"PNGDATA".to_vec()).image().unwrap();
    let form = MultipartForm::new()
        .text("fullname", "Ana Ruiz")
        .text("jersey", "7")
        .text("teamId", "team-1")
        .file("picture", photo);

    let created = api(addr).create_player(&session(), form).await.unwrap();
    assert_eq!(created.id, "p-77");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/players "));
    assert!(request.to_lowercase().contains("content-type: multipart/form-data"));
    assert!(request.contains(r#"name="fullname""#));
    assert!(request.contains("Ana Ruiz"));
    assert!(request.contains(r#"filename="ana.png""#));
    assert!(request.contains("PNGDATA"));
}

#[tokio::test]
async fn update_player_patches_json() {
    let (addr, server) = serve_once("200 OK", r#"{"status":"success","msg":"ok","data":null}"#).await;

    let update = PlayerUpdate {
        fullname: Some("Ana Ruiz".into()),
        birthday: None,
        jersey: Some(8),
    };
    api(addr).update_player(&session(), "p1", &update).await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("PATCH /api/players/p1 "));
    assert!(request.contains(r#""jersey":8"#));
    assert!(!request.contains("birthday"));
}

#[tokio::test]
async fn closed_port_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = api(addr).players_by_team(&session(), "team-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
