use trade_engine::instrument::*;

#[test]
fn asset_display_and_parse() {
    assert_eq!(Asset::BTC.to_string(), "BTC");
    assert_eq!(Asset::SOL.to_string(), "SOL");
    assert_eq!(Asset::USD.to_string(), "USD");

    assert_eq!("ETH".parse::<Asset>().unwrap(), Asset::ETH);
    assert_eq!("SOL".parse::<Asset>().unwrap(), Asset::SOL);
    assert!("DOGE".parse::<Asset>().is_err());
}

#[test]
fn pair_display_and_parse_supported() {
    assert_eq!(BTC_USD.to_string(), "BTC-USD");
    assert_eq!(SOL_USD.code(), "SOL-USD");

    assert_eq!("ETH-USD".parse::<Pair>().unwrap(), ETH_USD);
    assert_eq!("SOL-USD".parse::<Pair>().unwrap(), SOL_USD);
}

#[test]
fn pair_parse_rejects_unsupported() {
    let e = "BTC-EUR".parse::<Pair>().unwrap_err();
    assert!(e.contains("unsupported symbol"));
    assert!("btc-usd".parse::<Pair>().is_err());
}

#[test]
fn serde_pair_is_a_plain_string() {
    assert_eq!(serde_json::to_string(&BTC_USD).unwrap(), "\"BTC-USD\"");
    let p: Pair = serde_json::from_str("\"SOL-USD\"").unwrap();
    assert_eq!(p, SOL_USD);

    let bad = r#"{ "base": "BTC", "quote": "USD" }"#;
    assert!(serde_json::from_str::<Pair>(bad).is_err());
}

#[test]
fn supported_and_fromstr_in_sync() {
    for p in Pair::supported() {
        let parsed = p.code().parse::<Pair>().unwrap();
        assert_eq!(&parsed, p);
        assert_eq!(parsed.to_string(), p.code());
    }
}

#[test]
fn crypto_usd_factory_sets_usd_quote() {
    assert_eq!(Pair::crypto_usd(Asset::BTC), BTC_USD);
    assert_eq!(Pair::crypto_usd(Asset::SOL), SOL_USD);
}

#[test]
fn trading_pair_carries_symbol_and_assets() {
    let tp = TradingPair::new(ETH_USD, false);
    assert_eq!(tp.symbol, "ETH-USD");
    assert_eq!(tp.base_asset, Asset::ETH);
    assert_eq!(tp.quote_asset, Asset::USD);
    assert!(!tp.is_active);
}

#[test]
fn static_pairs_lists_every_supported_pair_active() {
    let dir = StaticPairs::default();
    let symbols: Vec<String> = dir.pairs().into_iter().map(|p| p.symbol).collect();
    assert_eq!(symbols, vec!["BTC-USD", "ETH-USD", "SOL-USD"]);
    assert_eq!(dir.active_symbols(), symbols);
}

#[test]
fn static_pairs_toggles_activity() {
    let dir = StaticPairs::default();
    assert!(dir.set_active("SOL-USD", false));
    assert_eq!(dir.active_symbols(), vec!["BTC-USD", "ETH-USD"]);
    assert!(!dir.lookup("SOL-USD").unwrap().is_active);

    assert!(!dir.set_active("DOGE-USD", true));
    assert!(dir.lookup("DOGE-USD").is_none());
}
