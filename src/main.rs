use anyhow::Context;

fn main() -> anyhow::Result<()> {
    erpkit::run().context("erpkit")
}
