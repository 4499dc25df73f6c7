use chrono::Local;
use serde_json::json;
use tracing::{error, info, warn, Instrument};

use otocap_admin::app_system::{setup_tracing, AdminSystem};
use otocap_admin::config::Config;
use otocap_admin::controllers::{stats, OrderSummary};
use otocap_admin::domain::{CategoryDraft, CustomerSnapshot, OrderDraft, OrderLine};
use otocap_admin::images::StagedImage;

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = Config::load().map_err(|e| e.to_string())?;
    info!(storage = %config.storage_url, "Starting admin core");

    let system = AdminSystem::start(&config);

    let user = system
        .session
        .sign_in(&config.admin_email, &config.admin_password)
        .await
        .map_err(|e| e.to_string())?;
    info!(user = ?user.email, "Signed in");

    // Catalogue: a category, then a product through the page form
    let span = tracing::info_span!("catalogue");
    let category = async {
        let draft = CategoryDraft {
            name: "Filtreler".into(),
            order: Some(1),
        };
        system.categories.create(draft, Vec::new()).await
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;
    info!(category_id = category.id, "Category created");

    let mut products = system.page(&system.products);
    let span = tracing::info_span!("product_form");
    let product = async {
        let form = products.form_mut();
        form.field_changed("name", json!("Yağ filtresi"))?;
        form.field_changed("category_id", json!(category.id.to_string()))?;
        form.field_changed("price", json!("249,90"))?;
        form.image_added(StagedImage::new("filtre.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]))?;
        products.submit().await
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;
    info!(product_id = product.id, urls = ?product.image_urls, "Product created");

    let hits = products.list().filter("filtre").len();
    info!(total = products.list().items().len(), hits, "Products listed");

    products.edit(product.id).map_err(|e| e.to_string())?;
    let form = products.form_mut();
    form.field_changed("price", json!(199.9)).map_err(|e| e.to_string())?;
    match products.submit().await {
        Ok(updated) => info!(price = updated.price, "Product updated"),
        Err(e) => error!(error = %e, "Product update failed"),
    }

    // Orders and the dashboard figures
    let span = tracing::info_span!("orders");
    async {
        let customer = CustomerSnapshot {
            name: Some("Deniz Kaya".into()),
            email: Some("deniz@example.com".into()),
            ..Default::default()
        };
        let lines = vec![OrderLine {
            product_name: product.name.clone(),
            quantity: 2,
            price: 199.9,
            ..Default::default()
        }];
        match OrderDraft::for_customer(&customer, &lines) {
            Ok(draft) => {
                if let Err(e) = system.orders.create(draft, Vec::new()).await {
                    error!(error = %e, "Order creation failed");
                }
            }
            Err(e) => error!(error = %e, "Order encoding failed"),
        }

        let orders = system.orders.get_all().await;
        let summary = OrderSummary::compute(&orders.data, Local::now().date_naive());
        info!(?summary, "Order summary");

        let banners = system.banners.get_all().await;
        let active = stats::active_banners(&banners.data, Local::now().naive_local());
        info!(active, "Active banners");
    }
    .instrument(span)
    .await;

    let users = system.users.get_all().await;
    match users.error {
        Some(e) => warn!(error = %e, "Users unavailable"),
        None => info!(count = users.data.len(), "Users listed"),
    }

    match products.delete(product.id, &|_: &str| true).await {
        Ok(outcome) => info!(?outcome, "Product delete finished"),
        Err(e) => error!(error = %e, "Product delete failed"),
    }
    products.teardown();

    system.session.sign_out();
    system.shutdown().await?;

    info!("Admin core stopped");
    Ok(())
}
