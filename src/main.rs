use winlog_triage::{cli_parse, run};

fn main() -> anyhow::Result<()> {
    let cli = cli_parse();
    run(&cli)
}
