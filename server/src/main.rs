use arena::{
    config::RelayConfig,
    lobby::Lobby,
    server_actor,
    server_websocket::{handle_connection, ConnectQuery},
};
use log::{error, info};
use tokio::sync::mpsc;
use warp::Filter;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let (actor_sender, actor_receiver) = mpsc::channel::<server_actor::Message>(4096);
    tokio::spawn(async { server_actor::run(actor_receiver, Lobby::new()).await });

    let routes = warp::path!("api" / "ws")
        .and(warp::query::<ConnectQuery>())
        .and(warp::ws())
        .map(move |query: ConnectQuery, ws: warp::ws::Ws| {
            let message_sender = actor_sender.clone();
            ws.on_upgrade(|websocket| handle_connection(websocket, query, message_sender))
        });

    info!("Relay listening on {}", config.socket_addr());
    warp::serve(routes).run(config.socket_addr()).await;
}
