//! Stub user, order, product and recommendation services for local runs.

use axum::{
    extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use profile_gateway::upstream::{Order, Product, User};

#[derive(Parser)]
#[command(name = "mock-upstreams")]
#[command(about = "Canned downstream services for the profile gateway", long_about = None)]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8081)]
    user_port: u16,

    #[arg(long, default_value_t = 8082)]
    order_port: u16,

    #[arg(long, default_value_t = 8083)]
    product_port: u16,

    #[arg(long, default_value_t = 8084)]
    recommendation_port: u16,

    /// Answer every recommendation request with 503.
    #[arg(long)]
    fail_recommendations: bool,
}

fn catalog() -> Vec<Product> {
    vec![
        Product {
            id: "p1".into(),
            name: "Laptop".into(),
            price: 1200.0,
        },
        Product {
            id: "p2".into(),
            name: "Headphones".into(),
            price: 199.9,
        },
        Product {
            id: "p3".into(),
            name: "Keyboard".into(),
            price: 89.5,
        },
    ]
}

async fn user(Path(id): Path<String>) -> Json<User> {
    tracing::info!(user_id = %id, "User lookup");
    Json(User {
        id,
        name: "Ivan Ivanov".into(),
        email: "ivan@test.com".into(),
    })
}

async fn orders(Path(id): Path<String>) -> Json<Vec<Order>> {
    tracing::info!(user_id = %id, "Orders lookup");
    Json(vec![
        Order {
            id: format!("{}-o1", id),
            amount: 1289.5,
            status: "delivered".into(),
        },
        Order {
            id: format!("{}-o2", id),
            amount: 199.9,
            status: "shipped".into(),
        },
    ])
}

async fn products() -> Json<Vec<Product>> {
    Json(catalog())
}

async fn recommendations(fail: bool, id: String) -> axum::response::Response {
    if fail {
        tracing::warn!(user_id = %id, "Recommendation failure injected");
        return (StatusCode::SERVICE_UNAVAILABLE, "recommendations unavailable").into_response();
    }
    Json(catalog().into_iter().rev().take(2).collect::<Vec<_>>()).into_response()
}

async fn serve(name: &'static str, addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(service = name, address = %addr, "Mock service listening");
    axum::serve(listener, app).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_upstreams=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let addr = |port: u16| -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", cli.host, port).parse()
    };

    let fail = cli.fail_recommendations;
    let users = Router::new().route("/users/{id}", get(user));
    let order_svc = Router::new().route("/orders/user/{id}", get(orders));
    let product_svc = Router::new().route("/products", get(products));
    let recommendation_svc = Router::new().route(
        "/recommendations/{id}",
        get(move |Path(id): Path<String>| recommendations(fail, id)),
    );

    tokio::try_join!(
        serve("user", addr(cli.user_port)?, users),
        serve("order", addr(cli.order_port)?, order_svc),
        serve("product", addr(cli.product_port)?, product_svc),
        serve("recommendation", addr(cli.recommendation_port)?, recommendation_svc),
    )?;

    Ok(())
}
