use gale::server::Server;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server = Server::new();

    server
        .on_connect(|socket| async move {
            println!("socket connected: {}", socket.id());

            socket.join("lobby").await;

            let lobby = socket.to("lobby").await;
            socket
                .on("chat", move |from: String, text: String| {
                    let lobby = lobby.clone();
                    async move {
                        println!("chat from {from}: {text}");
                        let _ = lobby.emit("chat", (from, text)).await;
                    }
                })
                .await
                .unwrap();
        })
        .await;

    server
        .on_disconnect(|socket| async move {
            println!("socket disconnected: {}", socket.id());
        })
        .await;

    server.listen("0.0.0.0:3001").await.unwrap();
}
