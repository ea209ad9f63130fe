//! services/web/src/web/tasks.rs
//!
//! The deferred "worker" tasks that fake the slow parts of the product: the
//! upload/conversion, the document render, and the tutor's reply.
//!
//! Every task is bound to the visit token that was current when it was
//! scheduled. Leaving the screen cancels the token, and a task re-checks it
//! after taking the session lock so a cancelled task never touches the session.

use crate::web::state::{AppState, Outbox, SessionState};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use unbound_core::{PendingReply, PendingUpload};

/// Sleeps for `delay` unless the token fires first. Returns `false` when cancelled.
async fn wait_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Publishes the session after a state change.
///
/// When the change moved to a new screen, the previous visit's timers are
/// cancelled and, on arriving in an unrendered workspace, the render timer is
/// started.
pub fn settle(
    app_state: &Arc<AppState>,
    session_lock: &Arc<Mutex<SessionState>>,
    outbox: &Outbox,
    session: &mut SessionState,
    visit_before: u64,
) {
    let visit = session.flow.visit();
    if visit != visit_before {
        session.rotate_visit_token();
        debug!(
            "Client {} entered {} (visit {}).",
            session.client_id,
            session.flow.screen(),
            visit
        );
        if session.flow.workspace().is_some_and(|ws| !ws.rendered) {
            tokio::spawn(render_process(
                app_state.clone(),
                session_lock.clone(),
                outbox.clone(),
                visit,
                session.visit_token.clone(),
            ));
        }
    }

    if outbox.send(session.snapshot()).is_err() {
        debug!("Outbox closed for client {}; snapshot dropped.", session.client_id);
    }
}

/// Simulates uploading and converting the picked file, then opens it.
pub async fn upload_process(
    app_state: Arc<AppState>,
    session_lock: Arc<Mutex<SessionState>>,
    outbox: Outbox,
    pending: PendingUpload,
    token: CancellationToken,
) {
    info!("Upload of '{}' started.", pending.file_name);

    if !wait_or_cancel(app_state.config.delays.upload, &token).await {
        info!("Upload of '{}' cancelled.", pending.file_name);
        return;
    }

    let mut session = session_lock.lock().await;
    if token.is_cancelled() {
        info!("Upload of '{}' cancelled.", pending.file_name);
        return;
    }

    let visit_before = session.flow.visit();
    match session.flow.complete_upload(pending.visit) {
        Ok(()) => {
            info!("Upload of '{}' finished; opening workspace.", pending.file_name);
            settle(&app_state, &session_lock, &outbox, &mut session, visit_before);
        }
        Err(rejection) => debug!("Upload completion ignored: {}", rejection),
    }
}

/// Simulates the PDF viewer finishing its first paint.
pub async fn render_process(
    app_state: Arc<AppState>,
    session_lock: Arc<Mutex<SessionState>>,
    outbox: Outbox,
    visit: u64,
    token: CancellationToken,
) {
    if !wait_or_cancel(app_state.config.delays.render, &token).await {
        return;
    }

    let mut session = session_lock.lock().await;
    if token.is_cancelled() {
        return;
    }

    let visit_before = session.flow.visit();
    match session.flow.mark_rendered(visit) {
        Ok(()) => settle(&app_state, &session_lock, &outbox, &mut session, visit_before),
        Err(rejection) => debug!("Render completion ignored: {}", rejection),
    }
}

/// Waits out the reply delay, asks the tutor, and appends its answer.
pub async fn reply_process(
    app_state: Arc<AppState>,
    session_lock: Arc<Mutex<SessionState>>,
    outbox: Outbox,
    pending: PendingReply,
    token: CancellationToken,
) {
    if !wait_or_cancel(app_state.config.delays.reply, &token).await {
        info!("Reply for '{}' cancelled.", pending.document);
        return;
    }

    let answer = tokio::select! {
        _ = token.cancelled() => {
            info!("Reply for '{}' cancelled.", pending.document);
            return;
        }
        result = app_state.tutor.answer_question(&pending.question, &pending.document) => result,
    };
    let answer = match answer {
        Ok(text) => text,
        Err(e) => {
            error!("Tutor failed to answer for '{}': {}", pending.document, e);
            return;
        }
    };

    let mut session = session_lock.lock().await;
    if token.is_cancelled() {
        info!("Reply for '{}' cancelled.", pending.document);
        return;
    }

    let visit_before = session.flow.visit();
    match session.flow.deliver_reply(pending.visit, answer) {
        Ok(()) => settle(&app_state, &session_lock, &outbox, &mut session, visit_before),
        Err(rejection) => debug!("Reply ignored: {}", rejection),
    }
}
