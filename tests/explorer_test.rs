//! End-to-end explorer tests
//!
//! Drives ZIP → county → sectors → drill-down → tree against mocked
//! crosswalk, CBP, and taxonomy endpoints on one server.

use mockito::{Matcher, Mock, Server, ServerGuard};
use zipindustry::api::{CensusClient, GeoClient, NaicsClient};
use zipindustry::models::{County, Metric, ZipCode};
use zipindustry::taxonomy::SECTORS;
use zipindustry::{ExplorerError, IndustryExplorer};

const HEADER: &str = r#"["NAME","NAICS2017_LABEL","EMP","ESTAB","PAYANN","NAICS2017","state","county"]"#;

fn explorer(server: &ServerGuard) -> IndustryExplorer {
    IndustryExplorer::new(
        GeoClient::with_base_url("test_token", server.url()),
        CensusClient::with_base_url(None, 2021, server.url()),
        NaicsClient::with_base_url(2017, server.url()),
    )
}

fn fairfax() -> County {
    County::new("51", "059")
}

fn cbp_body(code: &str, label: &str, emp: u64, estab: u64, pay: u64) -> String {
    format!(
        r#"[{},["Fairfax County, Virginia","{}","{}","{}","{}","{}","51","059"]]"#,
        HEADER, label, emp, estab, pay, code
    )
}

async fn mock_cbp(
    server: &mut ServerGuard,
    code: &str,
    data: Option<(&str, u64, u64, u64)>,
) -> Mock {
    let mock = server.mock("GET", "/2021/cbp").match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("for".into(), "county:059".into()),
        Matcher::UrlEncoded("in".into(), "state:51".into()),
        Matcher::UrlEncoded("NAICS2017".into(), code.into()),
    ]));
    match data {
        Some((label, emp, estab, pay)) => mock
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(cbp_body(code, label, emp, estab, pay)),
        None => mock.with_status(204),
    }
    .create_async()
    .await
}

async fn mock_totals(server: &mut ServerGuard) -> Mock {
    mock_cbp(server, "00", Some(("Total for all sectors", 1000, 100, 50000))).await
}

/// Sector fixture: four sectors with data, the rest suppressed
async fn mock_sectors(server: &mut ServerGuard) -> Vec<Mock> {
    let mut mocks = Vec::new();
    for (code, _) in SECTORS {
        let data = match *code {
            "54" => Some(("Professional, scientific, and technical services", 300, 20, 30000)),
            "62" => Some(("Health care and social assistance", 200, 30, 10000)),
            "72" => Some(("Accommodation and food services", 100, 40, 2000)),
            "23" => Some(("Construction", 100, 10, 6000)),
            _ => None,
        };
        mocks.push(mock_cbp(server, code, data).await);
    }
    mocks
}

async fn mock_listing(server: &mut ServerGuard, code: &str, body: &str) -> Mock {
    server
        .mock("GET", "/q")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("year".into(), "2017".into()),
            Matcher::UrlEncoded("code".into(), code.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

// =============================================================================
// Sector Level
// =============================================================================

#[tokio::test]
async fn test_top_sectors_ranked_with_percentages() {
    let mut server = Server::new_async().await;
    let totals = mock_totals(&mut server).await;
    let _sectors = mock_sectors(&mut server).await;

    let report = explorer(&server)
        .top_sectors(&fairfax(), Metric::Employees, 3)
        .await
        .unwrap();

    totals.assert_async().await;

    let codes: Vec<&str> = report.industries.iter().map(|i| i.code.as_str()).collect();
    // 23 and 72 tie at 100; the lower code wins
    assert_eq!(codes, vec!["54", "62", "23"]);
    assert_eq!(report.industries[0].percent, Some(30.0));
    assert_eq!(report.industries[1].percent, Some(20.0));
    assert_eq!(report.total, Some(1000));
    assert!(report.parent.is_none());
    assert_eq!(report.county.name.as_deref(), Some("Fairfax County, Virginia"));
}

#[tokio::test]
async fn test_top_sectors_by_establishments() {
    let mut server = Server::new_async().await;
    let _totals = mock_totals(&mut server).await;
    let _sectors = mock_sectors(&mut server).await;

    let report = explorer(&server)
        .top_sectors(&fairfax(), Metric::Establishments, 0)
        .await
        .unwrap();

    let codes: Vec<&str> = report.industries.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["72", "62", "54", "23"]);
    assert_eq!(report.industries[0].percent, Some(40.0));
    assert_eq!(report.total, Some(100));
}

#[tokio::test]
async fn test_top_sectors_without_totals_has_no_percentages() {
    let mut server = Server::new_async().await;
    let _totals = mock_cbp(&mut server, "00", None).await;
    let _sectors = mock_sectors(&mut server).await;

    let report = explorer(&server)
        .top_sectors(&fairfax(), Metric::Payroll, 2)
        .await
        .unwrap();

    assert_eq!(report.total, None);
    assert_eq!(report.industries[0].code, "54");
    assert!(report.industries.iter().all(|i| i.percent.is_none()));
}

#[tokio::test]
async fn test_county_without_any_data() {
    let mut server = Server::new_async().await;
    let _totals = mock_cbp(&mut server, "00", None).await;
    let mut _empty = Vec::new();
    for (code, _) in SECTORS {
        _empty.push(mock_cbp(&mut server, code, None).await);
    }

    let err = explorer(&server)
        .top_sectors(&fairfax(), Metric::Employees, 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExplorerError>(),
        Some(ExplorerError::NoData(_))
    ));
}

#[tokio::test]
async fn test_report_for_zip() {
    let mut server = Server::new_async().await;
    let hud = server
        .mock("GET", "/usps")
        .match_query(Matcher::UrlEncoded("query".into(), "22031".into()))
        .with_status(200)
        .with_body(
            r#"{"data": {"results": [{"geoid": "51059", "tot_ratio": 1.0, "state": "VA"}]}}"#,
        )
        .create_async()
        .await;
    let _totals = mock_totals(&mut server).await;
    let _sectors = mock_sectors(&mut server).await;

    let zip = ZipCode::parse("22031").unwrap();
    let report = explorer(&server)
        .report_for_zip(&zip, Metric::Employees, 1)
        .await
        .unwrap();

    hud.assert_async().await;
    assert_eq!(report.county.geoid(), "51059");
    assert_eq!(report.county.state.as_deref(), Some("VA"));
    assert_eq!(report.industries.len(), 1);
    assert_eq!(report.industries[0].code, "54");
}

// =============================================================================
// Drill-down
// =============================================================================

#[tokio::test]
async fn test_drill_down_sector() {
    let mut server = Server::new_async().await;
    let _totals = mock_totals(&mut server).await;
    let _listing = mock_listing(
        &mut server,
        "62",
        r#"{"code": 62, "title": "Health Care and Social Assistance", "children": [621, 622, 623, 624]}"#,
    )
    .await;
    let _m = mock_cbp(
        &mut server,
        "621",
        Some(("Ambulatory health care services", 80, 20, 4000)),
    )
    .await;
    let _m = mock_cbp(&mut server, "622", Some(("Hospitals", 100, 2, 5000))).await;
    let _m = mock_cbp(&mut server, "623", None).await;
    let _m = mock_cbp(&mut server, "624", Some(("Social assistance", 20, 8, 1000))).await;

    let report = explorer(&server)
        .drill_down(&fairfax(), "62", Metric::Employees, 10)
        .await
        .unwrap();

    assert_eq!(report.parent.as_deref(), Some("62"));
    let codes: Vec<&str> = report.industries.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["622", "621", "624"]);
    assert_eq!(report.industries[0].percent, Some(10.0));
}

#[tokio::test]
async fn test_drill_down_fills_missing_labels_from_taxonomy() {
    let mut server = Server::new_async().await;
    let _totals = mock_totals(&mut server).await;
    let _listing = mock_listing(
        &mut server,
        "22",
        r#"{"code": 22, "title": "Utilities", "children": [{"code": 221, "title": "Utilities"}]}"#,
    )
    .await;
    let _m = mock_cbp(&mut server, "221", Some(("", 15, 3, 900))).await;

    let report = explorer(&server)
        .drill_down(&fairfax(), "22", Metric::Employees, 10)
        .await
        .unwrap();

    assert_eq!(report.industries[0].title, "Utilities");
}

#[tokio::test]
async fn test_drill_down_national_industry_is_leaf() {
    let server = Server::new_async().await;

    let err = explorer(&server)
        .drill_down(&fairfax(), "541511", Metric::Employees, 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExplorerError>(),
        Some(ExplorerError::Leaf(_))
    ));
}

#[tokio::test]
async fn test_drill_down_children_without_data() {
    let mut server = Server::new_async().await;
    let _totals = mock_totals(&mut server).await;
    let _listing = mock_listing(
        &mut server,
        "21",
        r#"{"code": 21, "title": "Mining", "children": [211, 212]}"#,
    )
    .await;
    let _m = mock_cbp(&mut server, "211", None).await;
    let _m = mock_cbp(&mut server, "212", None).await;

    let err = explorer(&server)
        .drill_down(&fairfax(), "21", Metric::Employees, 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExplorerError>(),
        Some(ExplorerError::NoData(_))
    ));
}

// =============================================================================
// Tree
// =============================================================================

#[tokio::test]
async fn test_explore_two_levels_fetches_totals_once() {
    let mut server = Server::new_async().await;
    let totals = server
        .mock("GET", "/2021/cbp")
        .match_query(Matcher::UrlEncoded("NAICS2017".into(), "00".into()))
        .with_status(200)
        .with_body(cbp_body("00", "Total for all sectors", 1000, 100, 50000))
        .expect(1)
        .create_async()
        .await;
    let _m = mock_listing(
        &mut server,
        "54",
        r#"{"code": 54, "title": "Professional", "children": [541]}"#,
    )
    .await;
    let _m = mock_listing(
        &mut server,
        "541",
        r#"{"code": 541, "title": "Professional", "children": [5411, 5415, 5416]}"#,
    )
    .await;
    let _m = mock_cbp(
        &mut server,
        "541",
        Some(("Professional, scientific, and technical services", 300, 20, 30000)),
    )
    .await;
    let _m = mock_cbp(&mut server, "5411", Some(("Legal services", 120, 8, 9000))).await;
    let _m = mock_cbp(
        &mut server,
        "5415",
        Some(("Computer systems design and related services", 150, 6, 15000)),
    )
    .await;
    let _m = mock_cbp(&mut server, "5416", None).await;

    let tree = explorer(&server)
        .explore(&fairfax(), Some("54"), Metric::Employees, 10, 2)
        .await
        .unwrap();

    totals.assert_async().await;

    assert_eq!(tree.root.as_deref(), Some("54"));
    assert_eq!(tree.nodes.len(), 1);
    let node = &tree.nodes[0];
    assert_eq!(node.industry.code, "541");
    let child_codes: Vec<&str> = node.children.iter().map(|c| c.industry.code.as_str()).collect();
    assert_eq!(child_codes, vec!["5415", "5411"]);
    assert_eq!(node.children[0].industry.percent, Some(15.0));
    assert!(node.children.iter().all(|c| c.children.is_empty()));
}

#[tokio::test]
async fn test_explore_dead_end_becomes_leaf() {
    let mut server = Server::new_async().await;
    let _totals = mock_totals(&mut server).await;
    let _m = mock_listing(
        &mut server,
        "72",
        r#"{"code": 72, "title": "Accommodation", "children": [721, 722]}"#,
    )
    .await;
    let _m = mock_cbp(&mut server, "721", None).await;
    let _m = mock_cbp(
        &mut server,
        "722",
        Some(("Food services and drinking places", 90, 35, 1800)),
    )
    .await;

    // No listing or search answer for 722, and the static table stops at subsectors
    let _listing_722 = server
        .mock("GET", "/q")
        .match_query(Matcher::UrlEncoded("code".into(), "722".into()))
        .with_status(404)
        .create_async()
        .await;
    let _search = server
        .mock("GET", "/s")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let tree = explorer(&server)
        .explore(&fairfax(), Some("72"), Metric::Employees, 10, 3)
        .await
        .unwrap();

    assert_eq!(tree.nodes.len(), 1);
    assert_eq!(tree.nodes[0].industry.code, "722");
    assert!(tree.nodes[0].children.is_empty());
}

#[tokio::test]
async fn test_explore_from_sectors_depth_one_is_flat() {
    let mut server = Server::new_async().await;
    let _totals = mock_totals(&mut server).await;
    let _sectors = mock_sectors(&mut server).await;

    let tree = explorer(&server)
        .explore(&fairfax(), None, Metric::Employees, 2, 1)
        .await
        .unwrap();

    assert!(tree.root.is_none());
    assert_eq!(tree.nodes.len(), 2);
    assert!(tree.nodes.iter().all(|n| n.children.is_empty()));
}
