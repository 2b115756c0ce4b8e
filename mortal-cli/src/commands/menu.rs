use crate::render;
use crate::state::AppState;

pub async fn run(app: &AppState) -> anyhow::Result<()> {
    let menu = app.menu().await?;
    render::menu(&menu);
    Ok(())
}
