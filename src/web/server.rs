use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{api, AppState};

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.dashboard.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        // Dashboard page
        .route("/", get(serve_dashboard))
        // Status endpoints
        .route("/api/health", get(api::health_check))
        .route("/api/status", get(api::get_status))
        .route("/api/model", get(api::get_model))
        // History
        .route("/api/history", get(api::get_history))
        .route("/api/history/chart.svg", get(api::get_history_chart))
        // Forecasts
        .route("/api/forecast", post(api::post_forecast))
        .route("/api/forecast/latest", get(api::get_latest_forecast))
        .route("/api/forecast/latest/chart.svg", get(api::get_latest_chart))
        .route("/api/forecast/latest/csv", get(api::get_latest_csv))
        // Live session status
        .route("/ws", get(api::websocket_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

pub async fn start_dashboard_server(state: AppState) -> anyhow::Result<()> {
    let host: std::net::IpAddr = state.config.dashboard.host.parse()?;
    let addr = SocketAddr::new(host, state.config.dashboard.port);

    // Start loading the model so the sidebar status is ready on first visit
    let session = state.session.clone();
    tokio::spawn(async move {
        if let Err(e) = session.ensure_model().await {
            warn!("Dashboard started without a model: {}", e);
        }
    });

    let app = build_router(state);
    info!("Dashboard server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sales Forecasting with Prophet</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; display: flex; min-height: 100vh; color: #262730; }
        aside { width: 280px; background: #f0f2f6; padding: 1.5rem; }
        aside h2 { font-size: 1.1rem; margin-bottom: 1rem; }
        main { flex: 1; padding: 2rem 3rem; max-width: 1100px; }
        h1 { font-size: 2rem; margin-bottom: 1.5rem; }
        h3 { margin: 1.5rem 0 0.75rem; }
        label { display: block; font-size: 0.9rem; margin: 0.75rem 0 0.25rem; }
        input, select { padding: 0.4rem; border: 1px solid #ccc; border-radius: 4px; }
        button { margin-top: 1rem; padding: 0.5rem 1.2rem; border: 1px solid #ff4b4b; background: white; color: #ff4b4b; border-radius: 6px; cursor: pointer; }
        button:hover { background: #ff4b4b; color: white; }
        .row { display: flex; gap: 1.5rem; align-items: flex-end; flex-wrap: wrap; }
        .msg { padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 0; display: none; }
        .msg.ok { background: #dff5e3; color: #176f2c; display: block; }
        .msg.err { background: #fde2e2; color: #9b1c1c; display: block; }
        table { border-collapse: collapse; font-size: 0.85rem; margin-top: 0.5rem; }
        th, td { padding: 0.3rem 0.8rem; border-bottom: 1px solid #e6e6e6; text-align: right; }
        th:first-child, td:first-child { text-align: left; }
        .scroll { max-height: 320px; overflow-y: auto; display: inline-block; }
        #chart img, #history-chart img { max-width: 100%; }
        a.download { display: inline-block; margin-top: 1rem; }
    </style>
</head>
<body>
    <aside>
        <h2>Model Configuration</h2>
        <div id="model-status" class="msg"></div>
        <p id="session-status"></p>
        <div id="model-info"></div>
    </aside>
    <main>
        <h1>Sales Forecasting with Prophet</h1>

        <div class="row">
            <div>
                <label for="months">Enter the number of months you want to forecast:</label>
                <input id="months" type="number" min="1" max="60" step="1" value="12">
            </div>
            <div>
                <label for="frequency">Frequency</label>
                <select id="frequency">
                    <option value="monthly" selected>monthly</option>
                    <option value="daily">daily</option>
                </select>
            </div>
        </div>
        <div class="row">
            <div>
                <label for="start">Select start date for forecast</label>
                <input id="start" type="date">
            </div>
            <div>
                <label for="end">Select end date for forecast</label>
                <input id="end" type="date">
            </div>
            <div>
                <label><input id="use-range" type="checkbox"> Use date range</label>
            </div>
        </div>
        <button id="generate">Generate Forecast</button>

        <div id="forecast-msg" class="msg"></div>
        <div id="forecast" style="display:none">
            <h3>Forecasted Data:</h3>
            <div class="scroll"><table id="forecast-table"></table></div>
            <div id="chart"></div>
            <a class="download" href="/api/forecast/latest/csv">Download forecast as CSV</a>
        </div>

        <div id="history" style="display:none">
            <h3>Historical Sales Data</h3>
            <div class="scroll"><table id="history-table"></table></div>
            <div id="history-chart"></div>
        </div>
    </main>
    <script>
        const fmt = (v) => Number(v).toFixed(2);

        function show(el, text, ok) {
            el.textContent = text;
            el.className = 'msg ' + (ok ? 'ok' : 'err');
        }

        function renderTable(el, headers, rows) {
            el.innerHTML = '<tr>' + headers.map(h => '<th>' + h + '</th>').join('') + '</tr>' +
                rows.map(r => '<tr>' + r.map(c => '<td>' + c + '</td>').join('') + '</tr>').join('');
        }

        async function loadModel() {
            const status = document.getElementById('model-status');
            const res = await fetch('/api/model');
            const body = await res.json();
            if (!res.ok) {
                show(status, 'Error loading the model: ' + body.error, false);
                document.getElementById('generate').disabled = true;
                return;
            }
            show(status, 'Model loaded successfully.', true);
            document.getElementById('model-info').innerHTML =
                '<p><b>' + body.name + '</b></p>' +
                '<p>' + body.observations + ' observations</p>' +
                '<p>' + (body.history_start || '-') + ' to ' + (body.history_end || '-') + '</p>';
            loadHistory();
        }

        async function loadHistory() {
            const res = await fetch('/api/history');
            if (!res.ok) return;
            const body = await res.json();
            renderTable(document.getElementById('history-table'), ['ds', 'y'],
                body.rows.map(r => [r.ds, fmt(r.y)]));
            document.getElementById('history-chart').innerHTML =
                '<img alt="history" src="/api/history/chart.svg?t=' + Date.now() + '">';
            document.getElementById('history').style.display = 'block';
        }

        async function generate() {
            const msg = document.getElementById('forecast-msg');
            const useRange = document.getElementById('use-range').checked;
            const payload = useRange
                ? { mode: 'range', start: document.getElementById('start').value, end: document.getElementById('end').value }
                : { mode: 'periods', periods: Number(document.getElementById('months').value),
                    frequency: document.getElementById('frequency').value };

            const res = await fetch('/api/forecast', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(payload),
            });
            const body = await res.json();
            if (!res.ok) {
                show(msg, body.error, false);
                return;
            }
            show(msg, body.message, true);
            renderTable(document.getElementById('forecast-table'), ['ds', 'yhat', 'yhat_lower', 'yhat_upper'],
                body.rows.map(r => [r.ds, fmt(r.yhat), fmt(r.yhat_lower), fmt(r.yhat_upper)]));
            document.getElementById('chart').innerHTML = body.rows.length === 0 ? '' :
                '<img alt="' + body.title + '" src="/api/forecast/latest/chart.svg?t=' + Date.now() + '">';
            document.getElementById('forecast').style.display = 'block';
        }

        function connectStatus() {
            const proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
            const ws = new WebSocket(proto + location.host + '/ws');
            ws.onmessage = (event) => {
                const data = JSON.parse(event.data);
                const snap = data.snapshot;
                document.getElementById('session-status').textContent =
                    'Status: ' + (data.label || snap.status) + ' (' + snap.forecasts_count + ' forecasts)';
            };
            ws.onclose = () => setTimeout(connectStatus, 3000);
        }

        const today = new Date();
        const nextYear = new Date(today.getTime() + 365 * 86400000);
        document.getElementById('start').value = today.toISOString().slice(0, 10);
        document.getElementById('end').value = nextYear.toISOString().slice(0, 10);
        document.getElementById('generate').addEventListener('click', generate);
        loadModel();
        connectStatus();
    </script>
</body>
</html>
"##;
