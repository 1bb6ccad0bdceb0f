fn main() -> anyhow::Result<()> {
    sip_counter_lib::run()
}
