use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use env_logger::Env;
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use rs_chain_core::config::Config;
use rs_chain_core::model::generator::{ChainGenerator, Generator, SqliteGenerator};

/// Walk bound applied when the configuration sets none.
const DEFAULT_MAX_STEPS: usize = 256;

/// Address the server binds to when `RS_CHAIN_BIND` is unset.
const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	trigger: Option<String>,
	class: Option<String>,
	seed: Option<u64>,
}

struct SharedData {
	generator: SqliteGenerator,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Walks the chain from `trigger` (and `class`, defaulting to the
/// configured class). A `seed` makes the answer reproducible.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let trigger = match query.trigger.as_deref().map(str::trim) {
		Some(t) if !t.is_empty() => t,
		_ => return HttpResponse::BadRequest().body("Missing or empty trigger"),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};
	let generator = &shared_data.generator;
	let class = query
		.class
		.clone()
		.unwrap_or_else(|| generator.settings().default_class().to_owned());

	let result = match query.seed {
		Some(seed) => generator.generate_with_class(trigger, &class, &mut StdRng::seed_from_u64(seed)),
		None => generator.generate_with_class(trigger, &class, &mut rand::rng()),
	};

	match result {
		Ok(text) => HttpResponse::Ok().body(text),
		Err(e) => {
			error!("generate failed: {e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// HTTP PUT endpoint `/v1/register`
///
/// Registers every non-empty line of the body and answers with the number
/// of registered lines. Stops at the first failing line.
#[put("/v1/register")]
async fn put_register(data: web::Data<Mutex<SharedData>>, body: String) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};

	let mut count = 0;
	for line in body.lines().filter(|l| !l.trim().is_empty()) {
		if let Err(e) = shared_data.generator.register(line) {
			error!("register failed after {count} line(s): {e}");
			return HttpResponse::InternalServerError().body(format!("Failed after {count} line(s): {e}"));
		}
		count += 1;
	}

	HttpResponse::Ok().body(count.to_string())
}

#[get("/v1/dump")]
async fn get_dump(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};

	let mut out = Vec::new();
	match shared_data.generator.dump(&mut out) {
		Ok(()) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(out),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

#[get("/v1/texts")]
async fn get_texts(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Generator lock failed"),
	};

	let mut lines = Vec::new();
	let result = shared_data.generator.texts(&mut |id, text| {
		lines.push(format!("{id}\t{text}"));
		Ok(())
	});
	match result {
		Ok(()) => HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(lines.join("\n")),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// Builds the shared generator from the configuration file named by
/// `RS_CHAIN_CONFIG`, if any.
fn load_generator() -> rs_chain_core::Result<SqliteGenerator> {
	let config_path = env::var_os("RS_CHAIN_CONFIG").map(PathBuf::from);
	let config = Config::load_or_default(config_path.as_deref())?;

	let mut settings = config.generator_settings()?;
	settings.set_max_steps(config.max_steps.or(Some(DEFAULT_MAX_STEPS)))?;

	let mut generator = ChainGenerator::with_tokenizer(config.tokenizer()?, settings);
	generator.open(config.database_path())?;
	Ok(generator)
}

/// Main entry point for the server.
///
/// Opens the generator, wraps it in a `Mutex` so that one request at a
/// time reaches the store, and starts an Actix-web HTTP server.
///
/// # Notes
/// - Binds to `RS_CHAIN_BIND`, `127.0.0.1:5000` by default.
/// - Logging follows `RUST_LOG`, `info` by default.
#[actix_web::main]
async fn main() -> io::Result<()> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let generator = load_generator().map_err(io::Error::other)?;
	let shared_data = SharedData { generator };
	let shared_generator = web::Data::new(Mutex::new(shared_data));

	let bind = env::var("RS_CHAIN_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_owned());
	info!("listening on {bind}");

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_generator.clone())
			.service(get_generated)
			.service(put_register)
			.service(get_dump)
			.service(get_texts)
	})
		.bind(bind)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test;
	use rs_chain_core::model::settings::GeneratorSettings;
	use rs_chain_core::tokenizer::{Lexicon, LexiconTokenizer};

	fn shared() -> web::Data<Mutex<SharedData>> {
		let mut lexicon = Lexicon::default();
		lexicon.insert("犬", ["名詞", "一般"]);
		lexicon.insert("走る", ["動詞", "自立"]);
		let mut generator =
			ChainGenerator::with_tokenizer(LexiconTokenizer::with_user_lexicon(lexicon), GeneratorSettings::default());
		generator.open(":memory:").unwrap();
		web::Data::new(Mutex::new(SharedData { generator }))
	}

	#[actix_web::test]
	async fn registered_lines_can_be_generated_back() {
		let app = test::init_service(
			App::new()
				.app_data(shared())
				.service(get_generated)
				.service(put_register)
				.service(get_dump)
				.service(get_texts),
		)
		.await;

		let req = test::TestRequest::put()
			.uri("/v1/register")
			.set_payload("犬が走る。\n\n犬が走る。\n")
			.to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(&body[..], "2".as_bytes());

		// 犬, percent-encoded.
		let req = test::TestRequest::get().uri("/v1/generate?trigger=%E7%8A%AC&seed=1").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(&body[..], "犬が走る。".as_bytes());

		let req = test::TestRequest::get().uri("/v1/dump").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert!(String::from_utf8_lossy(&body).contains("犬_名詞\n  が_助詞 : 2\n"));

		let req = test::TestRequest::get().uri("/v1/texts").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(&body[..], "1\t犬が走る。\n2\t犬が走る。".as_bytes());
	}

	#[actix_web::test]
	async fn missing_trigger_is_a_bad_request() {
		let app = test::init_service(App::new().app_data(shared()).service(get_generated)).await;
		let req = test::TestRequest::get().uri("/v1/generate").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	}
}
