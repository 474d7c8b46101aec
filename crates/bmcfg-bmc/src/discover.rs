//! Controller fingerprinting
//!
//! Discovery walks an ordered table of unauthenticated `GET` probes and stops
//! at the first one that answers 200. The HP inventory probe additionally
//! inspects the returned XML to tell a chassis from a blade.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::sync::Arc;
use tracing::{debug, info};

use crate::driver::BmcDriver;
use crate::error::{ClassificationError, Result};
use crate::transport::{HttpTransport, Request, Transport};
use crate::types::{Credentials, Model, TransportConfig, Vendor};
use crate::vendors;

/// iLO blades report a management processor product name with this prefix
const ILO_PRODUCT_PREFIX: &str = "Integrated Lights-Out";

/// What a 200 on a probe path means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matcher {
    /// A device family that is recognised but not managed
    Unsupported(Vendor),
    /// HP `/xmldata` inventory, decided by its contents
    Inventory,
    /// The path alone identifies the model
    Status(Model),
}

struct Probe {
    path: &'static str,
    matcher: Matcher,
}

const PROBES: &[Probe] = &[
    Probe {
        path: "/res/ok.png",
        matcher: Matcher::Unsupported(Vendor::Cloudline),
    },
    Probe {
        path: "/xmldata?item=all",
        matcher: Matcher::Inventory,
    },
    Probe {
        path: "/session?aimGetProp=hostname,gui_str_title_bar,OEMHostName,fwVersion,sysDesc",
        matcher: Matcher::Status(Model::Idrac8),
    },
    Probe {
        path: "/sysmgmt/2015/bmc/info",
        matcher: Matcher::Status(Model::Idrac9),
    },
    Probe {
        path: "/cgi-bin/webcgi/login",
        matcher: Matcher::Status(Model::M1000e),
    },
    Probe {
        path: "/cgi/login.cgi",
        matcher: Matcher::Status(Model::SupermicroX10),
    },
];

/// Markers found in an HP `/xmldata` inventory
#[derive(Debug, Default, PartialEq, Eq)]
struct Inventory {
    infra2: bool,
    hsi: bool,
    mp_product: Option<String>,
}

/// Scan the children of the document root for `INFRA2`, `HSI` and `MP/PN`
fn scan_inventory(xml: &str) -> std::result::Result<Inventory, String> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut inventory = Inventory::default();

    fn mark(inventory: &mut Inventory, depth: usize, name: &[u8]) {
        if depth == 1 {
            match name {
                b"INFRA2" => inventory.infra2 = true,
                b"HSI" => inventory.hsi = true,
                _ => {}
            }
        }
    }

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                mark(&mut inventory, path.len(), &name);
                path.push(name);
            }
            Event::Empty(e) => mark(&mut inventory, path.len(), e.local_name().as_ref()),
            Event::Text(t) if path.len() == 3 && path[1] == b"MP" && path[2] == b"PN" => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                inventory
                    .mp_product
                    .get_or_insert_with(String::new)
                    .push_str(text.trim());
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if path.is_empty() {
        Ok(inventory)
    } else {
        Err("unexpected end of document".to_string())
    }
}

/// Decide the HP model from an inventory, `None` to keep probing
fn classify_inventory(xml: &str) -> std::result::Result<Option<Model>, ClassificationError> {
    let inventory = scan_inventory(xml).map_err(|detail| ClassificationError::UnknownModel {
        vendor: Vendor::Hp.to_string(),
        detail: format!("unreadable inventory: {}", detail),
    })?;

    if inventory.infra2 {
        return Ok(Some(Model::C7000));
    }

    if inventory.hsi {
        return match inventory.mp_product.as_deref() {
            Some(product) if product.starts_with(ILO_PRODUCT_PREFIX) => Ok(Some(Model::Ilo)),
            product => Err(ClassificationError::UnknownModel {
                vendor: Vendor::Hp.to_string(),
                detail: format!("management processor {:?}", product.unwrap_or_default()),
            }),
        };
    }

    Ok(None)
}

/// Fingerprint `host` without logging in
pub async fn identify_model(host: &str, transport: &dyn Transport) -> Result<Model> {
    for probe in PROBES {
        let response = transport.send(Request::get(probe.path)).await?;
        debug!(host, endpoint = probe.path, status = response.status, "Probe answered");

        if response.status != 200 {
            continue;
        }

        match probe.matcher {
            Matcher::Unsupported(vendor) => {
                info!(host, vendor = %vendor, "Device family not supported");
                return Err(ClassificationError::VendorNotSupported.into());
            }
            Matcher::Inventory => {
                if let Some(model) = classify_inventory(&response.text())? {
                    return Ok(model);
                }
                debug!(host, "Inventory has no known markers, continuing");
            }
            Matcher::Status(model) => return Ok(model),
        }
    }

    Err(ClassificationError::VendorUnknown.into())
}

/// Fingerprint `host` over `transport` and return a connected driver
pub async fn identify_with(
    host: &str,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
) -> Result<Box<dyn BmcDriver>> {
    let model = identify_model(host, transport.as_ref()).await?;
    info!(host, model = %model, vendor = %model.vendor(), "Identified controller");

    let mut driver = vendors::driver_for(model, host, credentials, transport);
    driver.connect().await?;
    Ok(driver)
}

/// Fingerprint `host` over HTTPS with default settings and return a connected driver
pub async fn identify(host: &str, credentials: Credentials) -> Result<Box<dyn BmcDriver>> {
    let transport = HttpTransport::new(TransportConfig::new(host))?;
    identify_with(host, credentials, Arc::new(transport)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BmcError;
    use crate::mock::MockTransport;
    use crate::transport::{Method, Response};

    const CHASSIS_INVENTORY: &str = r#"<?xml version="1.0"?>
<RIMP>
  <INFRA2>
    <ENCL>c7000-rack1</ENCL>
  </INFRA2>
</RIMP>"#;

    const BLADE_INVENTORY: &str = r#"<?xml version="1.0"?>
<RIMP>
  <HSI><SPN>ProLiant BL460c Gen9</SPN></HSI>
  <MP>
    <PN>Integrated Lights-Out 4 (iLO 4)</PN>
    <FWRI>2.55</FWRI>
  </MP>
</RIMP>"#;

    const OTHER_HP_INVENTORY: &str = r#"<RIMP><HSI/><MP><PN>Onboard Administrator</PN></MP></RIMP>"#;

    #[test]
    fn test_scan_inventory() {
        let chassis = scan_inventory(CHASSIS_INVENTORY).unwrap();
        assert!(chassis.infra2);
        assert!(!chassis.hsi);

        let blade = scan_inventory(BLADE_INVENTORY).unwrap();
        assert!(blade.hsi);
        assert_eq!(blade.mp_product.as_deref(), Some("Integrated Lights-Out 4 (iLO 4)"));

        // Markers only count as direct children of the root
        let nested = scan_inventory("<RIMP><X><INFRA2/></X></RIMP>").unwrap();
        assert!(!nested.infra2);

        assert!(scan_inventory("<RIMP><HSI>").is_err());
    }

    #[test]
    fn test_classify_inventory() {
        assert_eq!(classify_inventory(CHASSIS_INVENTORY), Ok(Some(Model::C7000)));
        assert_eq!(classify_inventory(BLADE_INVENTORY), Ok(Some(Model::Ilo)));
        assert_eq!(classify_inventory("<RIMP><OTHER/></RIMP>"), Ok(None));
        assert!(matches!(
            classify_inventory(OTHER_HP_INVENTORY),
            Err(ClassificationError::UnknownModel { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_asset_is_not_supported() {
        let transport = MockTransport::new().ok(Method::GET, "/res/ok.png", "");

        let err = identify_model("bmc.test", &transport).await.unwrap_err();

        assert!(matches!(
            err,
            BmcError::Classification(ClassificationError::VendorNotSupported)
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_probe_order() {
        let transport = MockTransport::new();

        let err = identify_model("bmc.test", &transport).await.unwrap_err();

        assert!(matches!(err, BmcError::Classification(ClassificationError::VendorUnknown)));
        let paths: Vec<String> = PROBES.iter().map(|p| p.path.to_string()).collect();
        assert_eq!(transport.paths(), paths);
    }

    #[tokio::test]
    async fn test_each_model_matches() {
        let cases = [
            ("/xmldata", CHASSIS_INVENTORY, Model::C7000),
            ("/xmldata", BLADE_INVENTORY, Model::Ilo),
            ("/session", "{}", Model::Idrac8),
            ("/sysmgmt/2015/bmc/info", "{}", Model::Idrac9),
            ("/cgi-bin/webcgi/login", "<html/>", Model::M1000e),
            ("/cgi/login.cgi", "<html/>", Model::SupermicroX10),
        ];

        for (path, body, expected) in cases {
            let transport = MockTransport::new().ok(Method::GET, path, body);
            let model = identify_model("bmc.test", &transport).await.unwrap();
            assert_eq!(model, expected, "probe {}", path);
        }
    }

    #[tokio::test]
    async fn test_inventory_without_markers_falls_through() {
        let transport = MockTransport::new()
            .ok(Method::GET, "/xmldata", "<RIMP><OTHER/></RIMP>")
            .ok(Method::GET, "/sysmgmt/2015/bmc/info", "{}");

        assert_eq!(identify_model("bmc.test", &transport).await.unwrap(), Model::Idrac9);
    }

    #[tokio::test]
    async fn test_unknown_hp_model_is_terminal() {
        let transport = MockTransport::new()
            .ok(Method::GET, "/xmldata", OTHER_HP_INVENTORY)
            .ok(Method::GET, "/sysmgmt/2015/bmc/info", "{}");

        let err = identify_model("bmc.test", &transport).await.unwrap_err();

        assert!(err.to_string().starts_with("identified as HP"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_non_200_success_does_not_match() {
        let transport = MockTransport::new()
            .on(Method::GET, "/res/ok.png", Response::new(204, ""))
            .ok(Method::GET, "/cgi/login.cgi", "");

        assert_eq!(
            identify_model("bmc.test", &transport).await.unwrap(),
            Model::SupermicroX10
        );
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let transport = MockTransport::new().fail(Method::GET, "/xmldata", "connection refused");

        let err = identify_model("bmc.test", &transport).await.unwrap_err();

        assert!(matches!(err, BmcError::Transport(_)));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_identify_with_connects_driver() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::GET, "/cgi/login.cgi", "<html/>")
                .on(
                    Method::POST,
                    "/cgi/login.cgi",
                    Response::new(200, "").with_header("Set-Cookie", "SID=abc; path=/"),
                ),
        );

        let driver = identify_with("bmc.test", Credentials::new("ADMIN", "ADMIN"), transport.clone())
            .await
            .unwrap();

        assert_eq!(driver.model(), Model::SupermicroX10);
        assert!(driver.is_connected());
        assert_eq!(transport.count(Method::POST, "/cgi/login.cgi"), 1);
    }

    #[tokio::test]
    async fn test_identify_with_login_failure() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::GET, "/cgi-bin/webcgi/login", "<html/>")
                .ok(Method::POST, "/cgi-bin/webcgi/login", "<html>bad password</html>"),
        );

        let err = identify_with("bmc.test", Credentials::new("root", "nope"), transport)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, BmcError::AuthenticationFailed(_)));
    }
}
