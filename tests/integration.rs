use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use place_server::{
    board::{Board, Color, Tile},
    config::ServerConfig,
    server::{accept_connections, ClientMessage, ServerMessage, ServerState},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, net::TcpStream, time::timeout};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::protocol::Message;
use url::Url;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const QUIET: Duration = Duration::from_millis(300);

async fn start_server(dimension: usize) -> (SocketAddr, Arc<ServerState>) {
    let config = ServerConfig {
        port: 0,
        dimension,
        ..ServerConfig::default()
    };
    let state = Arc::new(ServerState::new(config).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(accept_connections(listener, state.clone()));
    (addr, state)
}

async fn connect(addr: SocketAddr) -> Ws {
    let url = Url::parse(&format!("ws://{}", addr)).unwrap();
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn send(ws: &mut Ws, request: &ClientMessage) {
    let json = serde_json::to_string(request).unwrap();
    ws.send(Message::Text(json)).await.unwrap();
}

async fn recv(ws: &mut Ws) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a notification")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(ws: &mut Ws) {
    if let Ok(Some(Ok(frame))) = timeout(QUIET, ws.next()).await {
        panic!("unexpected frame: {:?}", frame);
    }
}

async fn login(addr: SocketAddr, name: &str) -> (Ws, Board) {
    let mut ws = connect(addr).await;
    send(&mut ws, &ClientMessage::Login { username: name.into() }).await;
    assert_eq!(recv(&mut ws).await, ServerMessage::LoginSuccess("Login Successful".into()));
    match recv(&mut ws).await {
        ServerMessage::Board(board) => (ws, board),
        other => panic!("expected board, got {:?}", other),
    }
}

fn change(row: i32, col: i32, color: Color) -> ClientMessage {
    ClientMessage::ChangeTile { tile: Tile::new(row, col, color, "") }
}

#[tokio::test]
async fn valid_change_reaches_every_client_and_duplicate_name_is_refused() {
    let (addr, _state) = start_server(3).await;

    let (mut alice, board) = login(addr, "alice").await;
    assert_eq!(board, Board::new(3));
    let (mut bob, _) = login(addr, "bob").await;

    send(&mut alice, &change(1, 1, Color::Red)).await;
    let expected = ServerMessage::TileChanged(Tile::new(1, 1, Color::Red, "alice"));
    assert_eq!(recv(&mut alice).await, expected);
    assert_eq!(recv(&mut bob).await, expected);

    let mut impostor = connect(addr).await;
    send(&mut impostor, &ClientMessage::Login { username: "alice".into() }).await;
    assert_eq!(recv(&mut impostor).await, ServerMessage::Error("Username already taken".into()));
    assert_silent(&mut impostor).await;
}

#[tokio::test]
async fn changes_inside_the_cooldown_are_dropped() {
    let (addr, state) = start_server(3).await;
    let (mut alice, _) = login(addr, "alice").await;
    let (mut bob, _) = login(addr, "bob").await;

    send(&mut alice, &change(0, 0, Color::Red)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    send(&mut alice, &change(0, 0, Color::Blue)).await;

    let first = ServerMessage::TileChanged(Tile::new(0, 0, Color::Red, "alice"));
    assert_eq!(recv(&mut bob).await, first);
    assert_silent(&mut bob).await;
    assert_eq!(state.board.snapshot().await.get(0, 0).map(|t| t.color), Some(Color::Red));

    // Well past 500ms since the accepted change.
    tokio::time::sleep(Duration::from_millis(250)).await;
    send(&mut alice, &change(0, 0, Color::Green)).await;
    assert_eq!(
        recv(&mut bob).await,
        ServerMessage::TileChanged(Tile::new(0, 0, Color::Green, "alice"))
    );
    assert_eq!(recv(&mut alice).await, first);
}

#[tokio::test]
async fn out_of_range_move_errors_only_the_submitter() {
    let (addr, state) = start_server(3).await;
    let (mut alice, _) = login(addr, "alice").await;
    let (mut bob, _) = login(addr, "bob").await;

    send(&mut alice, &change(3, 7, Color::Red)).await;

    assert_eq!(recv(&mut alice).await, ServerMessage::Error("Invalid Move".into()));
    assert_silent(&mut bob).await;
    assert_eq!(state.board.snapshot().await, Board::new(3));

    let report = state.stats.snapshot();
    assert_eq!(report.total_tiles, 1);
    assert_eq!(report.colors, vec![("red".to_string(), 1)]);
    assert_eq!(report.owners, vec![("alice".to_string(), 1)]);
    assert_eq!((report.cells[0].row, report.cells[0].col), (3, 7));
}

#[tokio::test]
async fn late_joiner_sees_history_only_in_its_board() {
    let (addr, _state) = start_server(4).await;
    let (mut alice, _) = login(addr, "alice").await;

    send(&mut alice, &change(2, 3, Color::Purple)).await;
    let _ = recv(&mut alice).await;

    let (mut carol, board) = login(addr, "carol").await;
    assert_eq!(board.get(2, 3), Some(&Tile::new(2, 3, Color::Purple, "alice")));
    assert_silent(&mut carol).await;
}

#[tokio::test]
async fn disconnect_frees_the_username() {
    let (addr, state) = start_server(3).await;
    let (alice, _) = login(addr, "alice").await;
    drop(alice);

    let mut waited = Duration::ZERO;
    while state.registry.get("alice").is_some() {
        assert!(waited < Duration::from_secs(2), "alice was never logged off");
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    let (_again, _) = login(addr, "alice").await;
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn unknown_requests_are_ignored() {
    let (addr, _state) = start_server(3).await;
    let (mut alice, _) = login(addr, "alice").await;

    alice
        .send(Message::Text(r#"{"type":"Chat","data":"hello"}"#.into()))
        .await
        .unwrap();
    alice.send(Message::Text("not json".into())).await.unwrap();
    assert_silent(&mut alice).await;

    send(&mut alice, &change(0, 1, Color::Teal)).await;
    assert_eq!(
        recv(&mut alice).await,
        ServerMessage::TileChanged(Tile::new(0, 1, Color::Teal, "alice"))
    );
}
