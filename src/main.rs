mod cli;

fn main() -> anyhow::Result<()> {
    let command_line_interface = cli::CommandLineInterface::load();
    doc_gql::telemetry::init(command_line_interface.log_filter())?;
    doc_gql::telemetry::catch_app_errors();
    command_line_interface.run()
}
