//! End-to-end wizard run against the in-process demo backend.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use wizard_api::{HttpGateway, StubServer};
    use wizard_core::config::ApiConfig;
    use wizard_core::event_bus::{capture_sink, CaptureSink};
    use wizard_core::types::{Control, Step, TableId, TableView, ViewEvent};
    use wizard_flow::{Outcome, WizardController, WizardSettings};

    fn audience_csv() -> Vec<u8> {
        let mut csv =
            String::from("msisdn,tenure_months,arpu,data_mb_30d,voice_min_30d,churn_risk,vas_spend_30d\n");
        for i in 1..=12 {
            csv.push_str(&format!("9715000{i:04},24,35,2048,300,0.1,5\n"));
        }
        csv.into_bytes()
    }

    async fn start() -> (StubServer, WizardController, Arc<CaptureSink<ViewEvent>>) {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = StubServer::spawn(addr).await.unwrap();
        let gateway = HttpGateway::new(&ApiConfig {
            base_url: server.base_url(),
            ..ApiConfig::default()
        })
        .unwrap();
        let sink = capture_sink::<ViewEvent>();
        let ctl = WizardController::new(Arc::new(gateway), sink.clone(), WizardSettings::default());
        (server, ctl, sink)
    }

    fn tables(sink: &CaptureSink<ViewEvent>, id: TableId) -> Vec<TableView> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::TableRendered { table, view } if table == id => Some(view),
                _ => None,
            })
            .collect()
    }

    fn column<'a>(view: &'a TableView, name: &str) -> Vec<&'a str> {
        let idx = view.columns.iter().position(|c| c == name).unwrap();
        view.rows.iter().map(|r| r[idx].as_str()).collect()
    }

    #[tokio::test]
    async fn test_full_wizard_run() {
        let (_server, mut ctl, sink) = start().await;
        ctl.start();

        assert_eq!(
            ctl.upload(Some(("audience.csv".into(), audience_csv()))).await,
            Outcome::Completed
        );
        assert_eq!(ctl.advance(), Outcome::Completed);
        assert_eq!(ctl.run_lifecycle().await, Outcome::Completed);
        assert_eq!(ctl.preview_lifecycle().await, Outcome::Completed);
        let lifecycle = tables(&sink, TableId::Lifecycle).pop().unwrap();
        assert_eq!(lifecycle.columns, vec!["msisdn", "lifecycle_stage"]);
        assert_eq!(lifecycle.rows.len(), 12);

        assert_eq!(ctl.advance(), Outcome::Completed);
        ctl.set_lobs(["DATA"]);
        ctl.select_opp_type("Upsell");
        assert_eq!(ctl.run_opportunity().await, Outcome::Completed);
        assert_eq!(ctl.preview_opportunity().await, Outcome::Completed);

        let opportunities = tables(&sink, TableId::Opportunity).pop().unwrap();
        assert!(!opportunities.is_empty());
        assert!(column(&opportunities, "lob").iter().all(|l| *l == "DATA"));
        assert!(column(&opportunities, "opportunity")
            .iter()
            .all(|o| o.starts_with("upsell")));

        assert_eq!(ctl.advance(), Outcome::Completed);
        assert_eq!(ctl.state().navigator.active(), Step::Offers);
        ctl.set_offer_count("Upsell", 3).unwrap();
        assert_eq!(ctl.run_offers().await, Outcome::Completed);
        assert_eq!(ctl.preview_offers().await, Outcome::Completed);

        let offers = tables(&sink, TableId::Offers).pop().unwrap();
        assert!(!offers.is_empty());
        assert!(column(&offers, "opportunity_data")
            .iter()
            .all(|o| o.starts_with("upsell")));
        assert!(offers.columns.contains(&"data_offer3".to_string()));

        assert_eq!(ctl.advance(), Outcome::Completed);
        assert_eq!(ctl.run_forecast().await, Outcome::Completed);
        let forecast = ctl.state().forecast.clone().unwrap();
        assert_eq!(forecast.tiles.len(), 3);
        assert!(forecast.tiles[0].value.starts_with('$'));
        assert_eq!(forecast.charts[0].labels.len(), 6);

        assert_eq!(ctl.advance(), Outcome::Completed);
        assert_eq!(ctl.launch().await, Outcome::Completed);
        assert!(ctl.state().navigator.is_control_enabled(Control::Download));
        assert_eq!(ctl.state().navigator.completed().len(), 6);

        let url = ctl.download().unwrap();
        assert!(url.contains("/api/download/"));

        assert_eq!(ctl.publish().await, Outcome::Completed);
        let receipt = ctl.state().publish_receipt.clone().unwrap();
        assert!(receipt.ok);
        assert!(receipt.reference_id.unwrap().starts_with("PUB-"));

        let modals = sink.count_where(|e| matches!(e, ViewEvent::Modal(_)));
        assert_eq!(modals, 0);
    }

    #[tokio::test]
    async fn test_offers_preview_before_generation_asks_to_generate() {
        let (_server, mut ctl, sink) = start().await;
        ctl.upload(Some(("audience.csv".into(), audience_csv()))).await;
        ctl.run_lifecycle().await;
        ctl.set_lobs(["DATA"]);
        ctl.set_opp_types(["Auto"]);
        ctl.run_opportunity().await;

        assert_eq!(ctl.preview_offers().await, Outcome::Failed);
        let title = sink.events().into_iter().find_map(|e| match e {
            ViewEvent::Modal(d) => Some(d.title),
            _ => None,
        });
        assert_eq!(title.as_deref(), Some("Generate Offers First"));
    }

    #[tokio::test]
    async fn test_rejected_upload_shows_server_message() {
        let (_server, mut ctl, sink) = start().await;
        assert_eq!(
            ctl.upload(Some(("audience.txt".into(), audience_csv()))).await,
            Outcome::Failed
        );
        let dialog = sink.events().into_iter().find_map(|e| match e {
            ViewEvent::Modal(d) => Some(d),
            _ => None,
        });
        let dialog = dialog.unwrap();
        assert_eq!(dialog.title, "Upload error");
        assert!(dialog.lines[0].contains("Only CSV files accepted"));
        assert!(ctl.state().session.is_none());
    }
}
