use crate::client::ControllerApi;
use crate::error::OmadaError;
use crate::locate::locate;
use crate::plan::{Strategy, plan};
use crate::topology::{ssid_path, walk};
use tracing::{debug, info, warn};

/// What a successful reconcile changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub ssid_name: String,
    pub ssid_id: String,
    pub group_id: String,
    pub enabled: bool,
    pub description: &'static str,
}

/// Runs `f` inside a logged-in session and always logs out afterwards,
/// whatever `f` returned. A failed logout is only logged so it never hides
/// the result of `f`.
pub fn with_session<A, T, F>(api: &mut A, f: F) -> Result<T, OmadaError>
where
    A: ControllerApi + ?Sized,
    F: FnOnce(&mut A, &str) -> Result<T, OmadaError>,
{
    let site = api.login()?;
    let result = f(&mut *api, &site);
    if let Err(err) = api.logout() {
        warn!(error = %err, "logout failed");
    }
    result
}

/// Finds `target` on the session's site and switches it on or off with
/// `strategy`. Exactly one PATCH is sent, and none when the SSID is missing.
pub fn reconcile<A: ControllerApi + ?Sized>(
    api: &mut A,
    target: &str,
    enabled: bool,
    strategy: &Strategy,
) -> Result<Outcome, OmadaError> {
    with_session(api, |api, site| apply(api, site, target, enabled, strategy))
}

fn apply<A: ControllerApi + ?Sized>(
    api: &mut A,
    site: &str,
    target: &str,
    enabled: bool,
    strategy: &Strategy,
) -> Result<Outcome, OmadaError> {
    info!(
        ssid = target,
        action = if enabled { "enable" } else { "disable" },
        "reconciling SSID"
    );
    let located = locate(walk(api, site)?, target)?;

    let document = plan(&located.ssid, enabled, strategy).as_value();
    let path = ssid_path(site, &located.group.id, &located.ssid_id);
    debug!(
        ssid = target,
        id = %located.ssid_id,
        group = %located.group.id,
        "updating SSID"
    );
    debug!(
        "document sent: {}",
        serde_json::to_string_pretty(&document).unwrap_or_default()
    );
    api.patch(&path, &document)?;

    Ok(Outcome {
        ssid_name: target.to_string(),
        ssid_id: located.ssid_id,
        group_id: located.group.id,
        enabled,
        description: strategy.describe(enabled),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::OmadaClient;
    use crate::client::tests::{CID, client, mock_login};
    use crate::topology::tests::{FakeController, SITE};
    use httpmock::prelude::*;
    use serde_json::json;

    fn mac_filter() -> Strategy {
        Strategy::MacFilter {
            mac_filter_id: "mf-001".into(),
        }
    }

    #[test]
    fn disabling_guest_patches_its_group_with_an_empty_allow_list() {
        let mut fake = FakeController::with_groups(vec![(
            "groupA",
            "Default",
            json!([{"id": "ssid1", "name": "Guest", "macFilterEnable": false, "band": 3}]),
        )]);

        let outcome = reconcile(&mut fake, "Guest", false, &mac_filter()).unwrap();
        assert_eq!(outcome.group_id, "groupA");
        assert!(!outcome.enabled);

        assert_eq!(fake.patches.len(), 1);
        let (path, body) = &fake.patches[0];
        assert_eq!(path, "/sites/site-key/setting/wlans/groupA/ssids/ssid1");
        assert_eq!(body["macFilterEnable"], json!(true));
        assert_eq!(body["macFilterType"], json!(1));
        assert_eq!(body["macFilterList"], json!([]));
        assert_eq!(body["macFilterId"], json!("mf-001"));
        assert_eq!(body["band"], json!(3));
        assert_eq!((fake.logins, fake.logouts), (1, 1));
    }

    #[test]
    fn missing_ssid_sends_no_patch_and_still_logs_out() {
        let mut fake = FakeController::with_groups(vec![(
            "groupA",
            "Default",
            json!([{"id": "ssid1", "name": "Guest"}]),
        )]);

        let err = reconcile(&mut fake, "Ghost", false, &mac_filter()).unwrap_err();
        assert!(matches!(err, OmadaError::NotFound { ref name, .. } if name == "Ghost"));
        assert!(fake.patches.is_empty());
        assert_eq!(fake.logouts, 1);
    }

    #[test]
    fn rejected_patch_is_surfaced_after_logout() {
        let mut fake = FakeController::with_groups(vec![(
            "groupA",
            "Default",
            json!([{"id": "ssid1", "name": "Guest"}]),
        )]);
        fake.patch_error = Some("Invalid MAC filter.".into());

        let err = reconcile(&mut fake, "Guest", false, &mac_filter()).unwrap_err();
        assert!(err.to_string().contains("Invalid MAC filter."));
        assert_eq!(fake.patches.len(), 1);
        assert_eq!(fake.logouts, 1);
    }

    #[test]
    fn failed_login_aborts_before_any_walk() {
        let mut fake = FakeController::with_groups(vec![]);
        fake.login_error = Some("bad password".into());

        let err = reconcile(&mut fake, "Guest", true, &Strategy::Broadcast).unwrap_err();
        assert!(matches!(err, OmadaError::Authentication(_)));
        assert!(fake.gets.is_empty());
        assert_eq!(fake.logouts, 0);
    }

    #[test]
    fn broadcast_enable_merges_over_untouched_fields() {
        let mut fake = FakeController::with_groups(vec![(
            "g1",
            "Default",
            json!([{"id": "s1", "name": "Maison", "broadcast": false, "band": 4,
                    "pmfMode": 1, "security": 3, "ssidRateLimit": 0}]),
        )]);

        reconcile(&mut fake, "Maison", true, &Strategy::Broadcast).unwrap();
        assert_eq!(
            fake.patches[0].1,
            json!({"id": "s1", "name": "Maison", "broadcast": true, "band": 3,
                   "pmfMode": 2, "security": 3, "ssidRateLimit": 0})
        );
    }

    #[test]
    fn end_to_end_against_controller() {
        let server = MockServer::start();
        mock_login(&server);
        let root = format!("/{CID}/api/v2/sites/{SITE}/setting/wlans");
        server.mock(|when, then| {
            when.method(GET).path(root.clone());
            then.status(200).json_body(json!({"errorCode": 0, "result": {
                "data": [{"id": "groupA", "name": "Default"}]
            }}));
        });
        server.mock(|when, then| {
            when.method(GET).path(format!("{root}/groupA/ssids"));
            then.status(200).json_body(json!({"errorCode": 0, "result": {
                "data": [{"id": "ssid1", "name": "Guest", "macFilterEnable": false, "vlanId": 7}]
            }}));
        });
        let update = server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path(format!("{root}/groupA/ssids/ssid1"))
                .header("Csrf-Token", "tok")
                .json_body(json!({
                    "id": "ssid1", "name": "Guest", "vlanId": 7,
                    "macFilterEnable": true, "macFilterType": 1, "macFilterList": [],
                    "policy": 1, "macFilterId": "mf-001"
                }));
            then.status(200).json_body(json!({"errorCode": 0, "msg": "Success."}));
        });
        let logout = server.mock(|when, then| {
            when.method(POST).path(format!("/{CID}/api/v2/logout"));
            then.status(200).json_body(json!({"errorCode": 0}));
        });

        let mut api: OmadaClient = client(&server);
        reconcile(&mut api, "Guest", false, &mac_filter()).unwrap();
        update.assert();
        logout.assert();
    }
}
