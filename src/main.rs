#[actix_web::main]
async fn main() -> std::io::Result<()> {
    solardocs_server::run().await
}
