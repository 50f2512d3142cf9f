//! OpenAPI document for the versioned surface, built from the composer's recorded routes.
//! The shell probes (`/`, `/health`, `/ready`) are deliberately absent.

use crate::config::Settings;
use crate::routes::{RouteSpec, RouterComposer};
use axum::http::Method;
use std::collections::BTreeMap;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder};
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Required, ResponseBuilder};

fn http_method(method: &Method) -> Option<HttpMethod> {
    Some(match *method {
        Method::GET => HttpMethod::Get,
        Method::POST => HttpMethod::Post,
        Method::PUT => HttpMethod::Put,
        Method::PATCH => HttpMethod::Patch,
        Method::DELETE => HttpMethod::Delete,
        Method::HEAD => HttpMethod::Head,
        Method::OPTIONS => HttpMethod::Options,
        Method::TRACE => HttpMethod::Trace,
        _ => return None,
    })
}

/// Route pattern to OpenAPI template: `:id` and `*rest` become `{id}` and `{rest}`.
pub fn template_path(path: &str) -> String {
    path.split('/')
        .map(|seg| match seg.strip_prefix(':').or_else(|| seg.strip_prefix('*')) {
            Some(name) => format!("{{{}}}", name),
            None => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|seg| seg.strip_prefix(':').or_else(|| seg.strip_prefix('*')))
        .collect()
}

fn operation_id(route: &RouteSpec) -> String {
    let suffix: String = route
        .path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_start_matches([':', '*']))
        .collect::<Vec<_>>()
        .join("_");
    let base = format!("{}_{}", route.method.as_str().to_lowercase(), route.tag);
    if suffix.is_empty() {
        base
    } else {
        format!("{}_by_{}", base, suffix)
    }
}

pub fn build_openapi(settings: &Settings, api: &RouterComposer) -> OpenApi {
    let mut grouped: BTreeMap<String, Vec<(&RouteSpec, String)>> = BTreeMap::new();
    for (full_path, route) in api.routes() {
        grouped
            .entry(template_path(&full_path))
            .or_default()
            .push((route, full_path));
    }

    let mut paths = PathsBuilder::new();
    for (template, routes) in grouped {
        let mut item = PathItemBuilder::new();
        for (route, full_path) in routes {
            let Some(method) = http_method(&route.method) else {
                continue;
            };
            let mut operation = OperationBuilder::new()
                .summary(Some(route.summary.clone()))
                .operation_id(Some(operation_id(route)))
                .tags(Some(vec![route.tag.clone()]))
                .response("200", ResponseBuilder::new().description("Successful response").build());
            for name in path_params(&full_path) {
                operation = operation.parameter(
                    ParameterBuilder::new()
                        .name(name)
                        .parameter_in(ParameterIn::Path)
                        .required(Required::True)
                        .build(),
                );
            }
            item = item.operation(method, operation.build());
        }
        paths = paths.path(template, item.build());
    }

    let description = Some(settings.description.clone()).filter(|d| !d.is_empty());
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(settings.project_name.clone())
                .version(settings.version.clone())
                .description(description)
                .build(),
        )
        .paths(paths.build())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::ApiRouter;

    fn settings() -> Settings {
        Settings::from_lookup(|k| match k {
            "VERSION" => Some("9.9.9".into()),
            "DESCRIPTION" => Some("test api".into()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn templates_path_params() {
        assert_eq!(template_path("/api/v1/users/:id"), "/api/v1/users/{id}");
        assert_eq!(template_path("/api/v1/files/*rest"), "/api/v1/files/{rest}");
        assert_eq!(template_path("/api/v1/users/"), "/api/v1/users/");
    }

    #[test]
    fn documents_versioned_routes_only() {
        let api = RouterComposer::new("/api/v1")
            .unwrap()
            .with(
                "/users",
                ApiRouter::new("users")
                    .get("/", "List users", || async { "" })
                    .post("/", "Create user", || async { "" })
                    .get("/:id", "Read user", || async { "" }),
            )
            .unwrap();
        let doc = serde_json::to_value(build_openapi(&settings(), &api)).unwrap();

        assert_eq!(doc["info"]["version"], "9.9.9");
        assert_eq!(doc["info"]["title"], "Minimalist API");
        assert_eq!(doc["info"]["description"], "test api");

        let paths = doc["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths["/api/v1/users/"]["get"].is_object());
        assert!(paths["/api/v1/users/"]["post"].is_object());
        let read = &paths["/api/v1/users/{id}"]["get"];
        assert_eq!(read["operationId"], "get_users_by_id");
        assert_eq!(read["parameters"][0]["name"], "id");
        assert_eq!(read["parameters"][0]["in"], "path");
        assert!(!paths.contains_key("/health"));
        assert!(!paths.contains_key("/"));
    }
}
