mod command;
mod util;
mod writer;

fn main() -> anyhow::Result<()> {
    command::run()
}
