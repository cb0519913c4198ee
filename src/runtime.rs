use tracing::info;

use crate::config::ServerSettings;
use crate::context::AppContext;
use crate::error::BookingError;
use crate::handlers::facade::BookingFacade;
use crate::handlers::routes;

pub async fn run_api(settings: ServerSettings) -> Result<(), BookingError> {
    let context = AppContext::initialize(&settings)?;
    let facade = BookingFacade::new(context);

    info!(
        addr = %settings.bind_addr,
        model = %settings.openai_model,
        timezone = settings.default_timezone.name(),
        "TailorTalk backend listening"
    );
    warp::serve(routes::routes(facade))
        .run(settings.bind_addr)
        .await;
    Ok(())
}
