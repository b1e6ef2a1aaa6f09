//! Integration tests for the Binance futures REST client against a mock
//! server: request shapes, signing headers, and the cancellation error codes
//! that must count as success.

use rust_decimal_macros::dec;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use binance_pyramid::{
    ApiCredentials, BinanceFuturesClient, Direction, InstrumentMeta, MarketData, OrderTransport,
    Side, StrategyError,
};

fn authed_client(base_url: &str) -> BinanceFuturesClient {
    BinanceFuturesClient::new(base_url)
        .unwrap()
        .with_credentials(ApiCredentials::new(
            "test-key".to_string(),
            "test-secret".to_string(),
        ))
}

#[tokio::test]
async fn test_get_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/ticker/price"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"symbol":"BTCUSDT","price":"42000.50"}"#),
        )
        .mount(&server)
        .await;

    let client = BinanceFuturesClient::new(&server.uri()).unwrap();
    let price = client.get_ticker("BTCUSDT").await.unwrap();
    assert_eq!(price, dec!(42000.50));
}

#[tokio::test]
async fn test_get_daily_candles() {
    let server = MockServer::start().await;
    let body = r#"[
        [1704067200000,"42000.0","43000.0","41000.0","42500.0","10.0",1704153599999,"1.0",1,"1.0","1.0","0"],
        [1704153600000,"42500.0","44000.0","42400.0","43900.0","12.0",1704239999999,"1.0",1,"1.0","1.0","0"]
    ]"#;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/klines"))
        .and(query_param("interval", "1d"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = BinanceFuturesClient::new(&server.uri()).unwrap();
    let candles = client.get_daily_candles("BTCUSDT", 2).await.unwrap();
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].high, dec!(43000.0));
    assert_eq!(candles[1].close, dec!(43900.0));
    assert!(candles[0].open_time < candles[1].open_time);
}

#[tokio::test]
async fn test_get_market_spec_from_exchange_info() {
    let server = MockServer::start().await;
    let body = r#"{"symbols":[
        {"symbol":"ETHUSDT","pricePrecision":2,"quantityPrecision":3,"filters":[
            {"filterType":"PRICE_FILTER","tickSize":"0.01"},
            {"filterType":"LOT_SIZE","minQty":"0.001"}
        ]},
        {"symbol":"BTCUSDT","pricePrecision":1,"quantityPrecision":3,"filters":[
            {"filterType":"PRICE_FILTER","tickSize":"0.1"},
            {"filterType":"LOT_SIZE","minQty":"0.001"}
        ]}
    ]}"#;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = BinanceFuturesClient::new(&server.uri()).unwrap();
    let spec = client.get_market_spec("ETHUSDT").await.unwrap();
    assert_eq!(spec.price_precision, 2);
    assert_eq!(spec.amount_precision, 3);
    assert_eq!(spec.min_amount, dec!(0.001));
    assert_eq!(spec.tick_size, dec!(0.01));

    let err = client.get_market_spec("DOGEUSDT").await.unwrap_err();
    assert!(matches!(err, StrategyError::PrecisionUnavailable(_)));
}

#[tokio::test]
async fn test_get_position_one_way_mode() {
    let server = MockServer::start().await;
    let body = r#"[{"symbol":"BTCUSDT","positionAmt":"-0.750","entryPrice":"43150.5","positionSide":"BOTH"}]"#;
    Mock::given(method("GET"))
        .and(path("/fapi/v2/positionRisk"))
        .and(header_exists("X-MBX-APIKEY"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = authed_client(&server.uri());
    // the signed amount is negative, so only the short query matches
    let long = client.get_position("BTCUSDT", Direction::Long).await.unwrap();
    assert!(long.is_none());
    let short = client
        .get_position("BTCUSDT", Direction::Short)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(short.amount, dec!(0.750));
    assert_eq!(short.avg_price, dec!(43150.5));
}

#[tokio::test]
async fn test_position_read_requires_credentials() {
    let client = BinanceFuturesClient::new("http://localhost:9").unwrap();
    let err = client
        .get_position("BTCUSDT", Direction::Long)
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::Authentication(_)));
}

#[tokio::test]
async fn test_submit_market_order_signed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .and(header_exists("X-MBX-APIKEY"))
        .and(query_param("type", "MARKET"))
        .and(query_param("side", "BUY"))
        .and(query_param("quantity", "0.5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"orderId":4321}"#))
        .mount(&server)
        .await;

    let client = authed_client(&server.uri());
    let ack = client
        .submit_market("BTCUSDT", Side::Buy, dec!(0.5))
        .await
        .unwrap();
    assert_eq!(ack.order_id.as_deref(), Some("4321"));
}

#[tokio::test]
async fn test_submit_stop_uses_algo_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/algoOrder"))
        .and(query_param("algoType", "CONDITIONAL"))
        .and(query_param("type", "STOP_MARKET"))
        .and(query_param("triggerPrice", "40000"))
        .and(query_param("reduceOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"algoId":77}"#))
        .mount(&server)
        .await;

    let client = authed_client(&server.uri());
    let ack = client
        .submit_stop_market("BTCUSDT", Side::Sell, dec!(0.5), dec!(40000), true)
        .await
        .unwrap();
    assert_eq!(ack.order_id.as_deref(), Some("77"));
}

#[tokio::test]
async fn test_order_rejection_maps_to_order_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"code":-1111,"msg":"Precision is over the maximum defined for this asset."}"#,
        ))
        .mount(&server)
        .await;

    let client = authed_client(&server.uri());
    let err = client
        .submit_market("BTCUSDT", Side::Buy, dec!(0.123456789))
        .await
        .unwrap_err();
    match err {
        StrategyError::OrderRejected(msg) => assert!(msg.contains("-1111")),
        other => panic!("expected OrderRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_sweep_tolerates_nothing_to_cancel() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/fapi/v1/allOpenOrders"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"code":-2011,"msg":"Unknown order sent."}"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/fapi/v1/algoOpenOrders"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"code":-1200,"msg":"No open algo order."}"#),
        )
        .mount(&server)
        .await;

    let client = authed_client(&server.uri());
    client.cancel_open_orders("BTCUSDT").await.unwrap();
    client.cancel_algo_orders("BTCUSDT").await.unwrap();
}

#[tokio::test]
async fn test_cancel_surfaces_real_failures() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/fapi/v1/allOpenOrders"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = authed_client(&server.uri());
    let err = client.cancel_open_orders("BTCUSDT").await.unwrap_err();
    assert!(matches!(err, StrategyError::Transport(_)));
}
