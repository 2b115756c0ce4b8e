use crate::state::AppState;

/// Forget any saved order and loan.
pub fn run(app: &AppState) -> anyhow::Result<()> {
    let mut controller = app.controller();
    controller.reset();
    app.loans().clear()?;
    println!("Cleared saved order and loan progress.");
    Ok(())
}
