use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to fetch authorized keys for {username} from {url}, error: {source}"))]
    FetchKeys { username: String, url: String, source: reqwest::Error },

    #[snafu(display("failed to parse a public key fetched for {username}"))]
    ParseKey { username: String },
}
