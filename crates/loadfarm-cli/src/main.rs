fn main() -> Result<(), Box<dyn std::error::Error>> {
    loadfarm_cli::runner::main(std::env::args().collect())
}
