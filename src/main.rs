use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    openimmo_store::apps::run_sync(std::env::args().skip(1))
}
