use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pagecache")]
#[command(about = "Fetch web pages through a short lived redis cache")]
#[command(version)]
pub struct Cli {
    /// Print how many times each URL was requested instead of fetching it
    #[arg(long)]
    pub count: bool,

    /// Pages to fetch
    #[arg(required = true)]
    pub urls: Vec<String>,
}
