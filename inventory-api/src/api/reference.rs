//! Read-only endpoints for categories, locations and vendors.
//!
//! Each row carries its `device_count`. The lists are small, so search,
//! ordering and pagination happen after loading.

use rocket::http::uri::Origin;
use rocket::serde::json::Json;
use rocket::{Route, State, get, routes};

use super::RequestUrl;
use crate::AppState;
use crate::error::InventoryError;
use crate::models::{CategoryWithCount, LocationWithCount, VendorWithCount};
use crate::orm::DbConn;
use crate::orm::category::{get_category, list_categories};
use crate::orm::location::{get_location, list_locations};
use crate::orm::vendor::{get_vendor, list_vendors};
use crate::query::reference::{DEFAULT_ORDERING, ORDERING_FIELDS, ReferenceRow, search_and_sort};
use crate::query::{Page, PageRequest, parse_ordering, search_term};
use crate::session_guards::AuthenticatedUser;

/// Search, order and cut one page out of a loaded list.
fn page_of<T: ReferenceRow>(
    rows: Vec<T>,
    search: Option<&str>,
    ordering: Option<&str>,
    request: &PageRequest,
) -> Result<Page<T>, InventoryError> {
    let keys = parse_ordering(ordering, ORDERING_FIELDS, DEFAULT_ORDERING);
    let rows = search_and_sort(rows, search_term(search).as_deref(), &keys);
    let count = rows.len() as i64;
    Ok(Page::new(request.slice(rows)?, count))
}

/// List Categories endpoint.
///
/// - **URL:** `/api/categories`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// # Query Parameters
/// - `search`: substring over name and description
/// - `ordering`: `name` or `device_count`, `-` to reverse
/// - `page`, `page_size`
#[allow(clippy::too_many_arguments)]
#[get("/categories?<search>&<ordering>&<page>&<page_size>")]
pub async fn list_categories_endpoint(
    search: Option<String>,
    ordering: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<CategoryWithCount>>, InventoryError> {
    let request = PageRequest::new(page, page_size, state.page_size);
    let url = RequestUrl::new(uri);
    let rows = db.run(list_categories).await?;
    let page = page_of(rows, search.as_deref(), ordering.as_deref(), &request)?;
    Ok(Json(url.link(page, &request)))
}

/// Get Category endpoint.
///
/// - **URL:** `/api/categories/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/categories/<id>")]
pub async fn get_category_endpoint(
    id: i32,
    db: DbConn,
    _auth: AuthenticatedUser,
) -> Result<Json<CategoryWithCount>, InventoryError> {
    Ok(Json(db.run(move |conn| get_category(conn, id)).await?))
}

/// List Locations endpoint.
///
/// - **URL:** `/api/locations`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// `search` covers name, building, room and address.
#[allow(clippy::too_many_arguments)]
#[get("/locations?<search>&<ordering>&<page>&<page_size>")]
pub async fn list_locations_endpoint(
    search: Option<String>,
    ordering: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<LocationWithCount>>, InventoryError> {
    let request = PageRequest::new(page, page_size, state.page_size);
    let url = RequestUrl::new(uri);
    let rows = db.run(list_locations).await?;
    let page = page_of(rows, search.as_deref(), ordering.as_deref(), &request)?;
    Ok(Json(url.link(page, &request)))
}

/// Get Location endpoint.
///
/// - **URL:** `/api/locations/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/locations/<id>")]
pub async fn get_location_endpoint(
    id: i32,
    db: DbConn,
    _auth: AuthenticatedUser,
) -> Result<Json<LocationWithCount>, InventoryError> {
    Ok(Json(db.run(move |conn| get_location(conn, id)).await?))
}

/// List Vendors endpoint.
///
/// - **URL:** `/api/vendors`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// `search` covers name, contact person and email.
#[allow(clippy::too_many_arguments)]
#[get("/vendors?<search>&<ordering>&<page>&<page_size>")]
pub async fn list_vendors_endpoint(
    search: Option<String>,
    ordering: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<VendorWithCount>>, InventoryError> {
    let request = PageRequest::new(page, page_size, state.page_size);
    let url = RequestUrl::new(uri);
    let rows = db.run(list_vendors).await?;
    let page = page_of(rows, search.as_deref(), ordering.as_deref(), &request)?;
    Ok(Json(url.link(page, &request)))
}

/// Get Vendor endpoint.
///
/// - **URL:** `/api/vendors/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/vendors/<id>")]
pub async fn get_vendor_endpoint(
    id: i32,
    db: DbConn,
    _auth: AuthenticatedUser,
) -> Result<Json<VendorWithCount>, InventoryError> {
    Ok(Json(db.run(move |conn| get_vendor(conn, id)).await?))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_categories_endpoint,
        get_category_endpoint,
        list_locations_endpoint,
        get_location_endpoint,
        list_vendors_endpoint,
        get_vendor_endpoint
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{seed_category, seed_device, setup_test_db};

    #[test]
    fn pages_are_cut_after_search_and_sort() {
        let mut conn = setup_test_db();
        let laptops = seed_category(&mut conn, "Laptops");
        seed_category(&mut conn, "Servers");
        seed_category(&mut conn, "Switches");
        seed_device(&mut conn, "LT-1", laptops.id);
        let rows = list_categories(&mut conn).unwrap();

        let request = PageRequest::new(Some(1), Some(1), 20);
        let page = page_of(rows.clone(), Some("s"), Some("-name"), &request).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.results[0].category.name, "Switches");

        let by_count = page_of(rows.clone(), None, Some("-device_count"), &request).unwrap();
        assert_eq!(by_count.results[0].category.name, "Laptops");

        let past_end = PageRequest::new(Some(5), Some(1), 20);
        assert!(matches!(page_of(rows, None, None, &past_end), Err(InventoryError::NotFound(_))));
    }
}
