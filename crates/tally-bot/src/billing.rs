//! HTTP client for the billing cabinet.
//!
//! Every call authenticates with the user's cabinet login over HTTP basic
//! auth; nothing is cached between calls.
//!
//! | Operation       | Request                                     |
//! |-----------------|---------------------------------------------|
//! | `list_accounts` | `GET {base}/accounts`                       |
//! | `get_balance`   | `GET {base}/accounts/{n}/balance?date=DATE` |
//! | `get_receipt`   | `GET {base}/accounts/{n}/receipt`           |

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tally_core::{
  account::{Account, Snapshot},
  provider::BillingProvider,
  user::Credentials,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The cabinet refused the login and password.
  #[error("credentials rejected")]
  Rejected,

  #[error("unexpected status {0}")]
  Status(StatusCode),

  #[error("invalid billing base url: {0}")]
  BaseUrl(String),
}

/// [`BillingProvider`] backed by the cabinet's JSON API.
///
/// Cheap to clone, the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpBillingProvider {
  client:   Client,
  base_url: Url,
}

impl HttpBillingProvider {
  pub fn new(base_url: &str) -> Result<Self, ProviderError> {
    let base_url =
      Url::parse(base_url).map_err(|e| ProviderError::BaseUrl(format!("{base_url}: {e}")))?;
    if base_url.cannot_be_a_base() {
      return Err(ProviderError::BaseUrl(base_url.to_string()));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, base_url })
  }

  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn get(&self, credentials: &Credentials, url: Url) -> RequestBuilder {
    self
      .client
      .get(url)
      .basic_auth(&credentials.login, Some(&credentials.password))
  }

  fn check(resp: Response) -> Result<Response, ProviderError> {
    match resp.status() {
      s if s.is_success() => Ok(resp),
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Rejected),
      s => Err(ProviderError::Status(s)),
    }
  }
}

impl BillingProvider for HttpBillingProvider {
  type Error = ProviderError;

  async fn list_accounts(&self, credentials: &Credentials) -> Result<Vec<Account>, ProviderError> {
    debug!(login = %credentials.login, "listing accounts");
    let resp = self.get(credentials, self.url(&["accounts"])).send().await?;
    Ok(Self::check(resp)?.json().await?)
  }

  async fn get_balance(
    &self,
    credentials: &Credentials,
    account: &str,
    as_of: DateTime<Utc>,
  ) -> Result<Snapshot, ProviderError> {
    debug!(account, "fetching balance");
    let resp = self
      .get(credentials, self.url(&["accounts", account, "balance"]))
      .query(&[("date", as_of.format("%Y-%m-%d").to_string())])
      .send()
      .await?;
    Ok(Self::check(resp)?.json().await?)
  }

  async fn get_receipt(&self, credentials: &Credentials, account: &str) -> Result<Vec<u8>, ProviderError> {
    debug!(account, "fetching receipt");
    let resp = self
      .get(credentials, self.url(&["accounts", account, "receipt"]))
      .send()
      .await?;
    Ok(Self::check(resp)?.bytes().await?.to_vec())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, method, path, query_param},
  };

  use super::*;

  fn creds() -> Credentials { Credentials::new("alice", "pw") }

  async fn setup() -> (MockServer, HttpBillingProvider) {
    let server = MockServer::start().await;
    let provider = HttpBillingProvider::new(&format!("{}/api/", server.uri())).unwrap();
    (server, provider)
  }

  #[test]
  fn rejects_non_base_url() {
    assert!(matches!(
      HttpBillingProvider::new("mailto:billing@example.com"),
      Err(ProviderError::BaseUrl(_))
    ));
    assert!(matches!(HttpBillingProvider::new("not a url"), Err(ProviderError::BaseUrl(_))));
  }

  #[tokio::test]
  async fn lists_accounts_with_basic_auth() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
      .and(path("/api/accounts"))
      .and(basic_auth("alice", "pw"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"number": "100", "address": "Main St 1"},
        {"number": "200", "address": "Elm St 2"},
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let accounts = provider.list_accounts(&creds()).await.unwrap();
    assert_eq!(accounts, vec![Account::new("100", "Main St 1"), Account::new("200", "Elm St 2")]);
  }

  #[tokio::test]
  async fn unauthorized_maps_to_rejected() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
      .and(path("/api/accounts"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let err = provider.list_accounts(&creds()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Rejected), "{err}");
  }

  #[tokio::test]
  async fn balance_is_requested_for_the_date() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
      .and(path("/api/accounts/100/balance"))
      .and(query_param("date", "2024-03-15"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "period": "March 2024",
        "rows": [{"label": "Total", "amount": "12.50"}],
      })))
      .expect(1)
      .mount(&server)
      .await;

    let as_of = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
    let snap = provider.get_balance(&creds(), "100", as_of).await.unwrap();
    assert_eq!(snap.period, "March 2024");
    assert_eq!(snap.rows[0].amount, "12.50");
  }

  #[tokio::test]
  async fn server_error_is_reported_with_status() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
      .and(path("/api/accounts/100/balance"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let err = provider.get_balance(&creds(), "100", Utc::now()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Status(StatusCode::SERVICE_UNAVAILABLE)), "{err}");
  }

  #[tokio::test]
  async fn receipt_returns_raw_bytes() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
      .and(path("/api/accounts/100/receipt"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
      .mount(&server)
      .await;

    let pdf = provider.get_receipt(&creds(), "100").await.unwrap();
    assert_eq!(pdf, b"%PDF-1.4 body");
  }
}
