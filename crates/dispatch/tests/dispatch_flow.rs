use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use url::Url;

use serpwatch_core_types::{SerpMessage, TabId};
use serpwatch_detect::{Navigation, PageLoad};
use serpwatch_dispatch::EventDispatcher;
use serpwatch_providers::ProviderRegistry;

const GOOGLE_SERP: &str = "https://www.google.com/?q=test&ie=utf-8&oe=utf-8&client=firefox-b";

fn nav(spec: &str) -> Navigation {
    Navigation::top_level(Url::parse(spec).unwrap())
}

#[tokio::test]
async fn navigation_stream_produces_ordered_messages() {
    let providers = Arc::new(ProviderRegistry::builtin().clone());
    let (dispatcher, mut rx) = EventDispatcher::new(providers, 16);
    let tab = TabId::from("tab-1");

    dispatcher.on_location_change(&tab, &nav(GOOGLE_SERP));
    // Reload: nothing new on the bus.
    dispatcher.on_location_change(&tab, &nav(GOOGLE_SERP));
    // Leaving closes the SERP out.
    dispatcher.on_location_change(&tab, &nav("https://www.example.com/?x=1"));

    assert!(matches!(
        rx.recv().await.unwrap(),
        SerpMessage::RegisterSerp { .. }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        SerpMessage::DeregisterSerp { .. }
    ));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn cookie_gated_page_load_flows_through_the_same_tab_state() {
    let providers = Arc::new(ProviderRegistry::builtin().clone());
    let (dispatcher, mut rx) = EventDispatcher::new(providers, 16);
    let tab = TabId::from("tab-1");

    // Open a google SERP, then a bing follow-on in the same tab: the bing
    // registration must be preceded by the google deregistration.
    dispatcher.on_location_change(&tab, &nav(GOOGLE_SERP));
    dispatcher.on_page_load(
        &tab,
        &PageLoad {
            top_level: true,
            url: Url::parse("https://www.bing.com/search?q=test&FORM=QBRE").unwrap(),
            cookies: "SRCHS=PC=MOZI".into(),
        },
    );

    assert!(matches!(
        rx.recv().await.unwrap(),
        SerpMessage::RegisterSerp { sap, .. } if sap == "google"
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        SerpMessage::DeregisterSerp { .. }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        SerpMessage::RegisterSerp { code, sap, .. } if code == "MOZI" && sap == "bing"
    ));
}
