use fleetload::error::AppResult;

fn main() -> AppResult<()> {
    fleetload::run()
}
