/// Make a POST request sending and expecting JSON.
/// if JSON deser fails, emit a `WARN` level tracing event
///
/// Expands to a `Result<$expected, $err>`; transport errors are propagated
/// with `?`, so the enclosing function's error type must convert from
/// `reqwest::Error`.
macro_rules! json_post {
    ($client:expr, $url:expr, $params:expr, $expected:ty, $err:ty,) => {
        json_post!($client, $url, $params, $expected, $err)
    };

    ($client:expr, $url:expr, $params:expr, $expected:ty, $err:ty) => {{
        let url = $url;
        let resp: reqwest::Response = $client.post(url.clone()).json($params).send().await?;
        let text = resp.text().await?;

        let result = serde_json::from_str::<$expected>(&text).map_err(Into::<$err>::into);

        if result.is_err() {
            tracing::warn!(
                method = "POST",
                url = %url,
                params = serde_json::to_string(&$params).unwrap_or_default().as_str(),
                response = text.as_str(),
                "Unexpected response from server"
            );
        }
        result
    }};
}
