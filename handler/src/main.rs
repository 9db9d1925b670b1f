use aws_lambda_events::apigw::ApiGatewayProxyResponse;
use aws_lambda_events::encodings::Body;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Serialize)]
struct Greeting {
    message: &'static str,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::log::init();

    lambda_runtime::run(service_fn(func)).await?;
    Ok(())
}

async fn func(event: LambdaEvent<Value>) -> Result<ApiGatewayProxyResponse, Error> {
    info!("event: {}", event.payload);

    let body = serde_json::to_string(&Greeting {
        message: "Hello from Lambda!",
    })?;

    let mut response = ApiGatewayProxyResponse {
        status_code: 200,
        body: Some(Body::Text(body)),
        ..Default::default()
    };
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(response)
}
