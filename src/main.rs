use anyhow::{anyhow, bail, Context};
use bike_rental_client::adapters::{FileSessionStore, MemoryNavigator, TracingNotifier};
use bike_rental_client::app::{render_list, render_record, OutputFormat, RentalApp};
use bike_rental_client::config::{
    AdminCommand, BikesCommand, BookingsCommand, CliConfig, Command, UsersCommand,
};
use bike_rental_client::core::api::LOGIN_PATH;
use bike_rental_client::core::services::{BikeQuery, UserQuery};
use bike_rental_client::core::{nav_links, ActionOutcome, RouteDecision};
use bike_rental_client::domain::model::{Preferences, Range};
use bike_rental_client::domain::ports::SessionStore;
use bike_rental_client::utils::error::ClientError;
use bike_rental_client::utils::forms::{
    BikeForm, BookingForm, ForgotPasswordForm, LoginForm, ProfileForm, ResetPasswordForm,
    SignupForm, UpdatePasswordForm,
};
use bike_rental_client::utils::{logger, validation::Validate};
use clap::Parser;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting bike-rental CLI");
    tracing::debug!("Page for this command: {}", cli.route_path());

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ClientError>() {
            Some(client_error) => {
                tracing::error!(
                    "❌ Command failed: {} (Category: {:?})",
                    client_error,
                    client_error.category()
                );
                tracing::error!("💡 Recovery suggestion: {}", client_error.recovery_suggestion());

                eprintln!("❌ {}", client_error.user_friendly_message());
                eprintln!("💡 {}", client_error.recovery_suggestion());
                std::process::exit(client_error.exit_code());
            }
            None => {
                tracing::error!("❌ Command failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    let config = cli.client_config()?;
    config.validate()?;

    let store = FileSessionStore::new(config.session_file());
    let navigator = Arc::new(MemoryNavigator::default());
    let app = RentalApp::start(&config, store, Arc::new(TracingNotifier::new()), navigator).await?;

    let outcome = dispatch(&app, &cli).await;

    // 指令失敗也要保存 session，例如 401 後清掉的 cookie
    app.persist().await.context("Failed to save session")?;
    outcome
}

async fn dispatch<S: SessionStore>(app: &RentalApp<S>, cli: &CliConfig) -> anyhow::Result<()> {
    let format = cli.format;

    match &cli.command {
        Command::Route { path } => {
            let decision = app.visit(path);
            return print_record(
                &json!({
                    "path": path,
                    "guard": format!("{:?}", app.routes().guard_for(path)),
                    "decision": decision.to_string(),
                }),
                format,
            );
        }
        Command::Nav { current } => {
            let links = nav_links(app.session().user().as_ref(), current);
            return print(
                match format {
                    OutputFormat::Table => links
                        .iter()
                        .map(|link| {
                            let marker = if link.active { "*" } else { " " };
                            format!("{} {:<16} {}", marker, link.label, link.path)
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                    _ => render_record(&links, format)?,
                },
            );
        }
        Command::Status => {
            let state = app.session().state();
            return print_record(
                &json!({
                    "authenticated": state.is_authenticated,
                    "user": state.user.as_ref().map(|u| u.name.clone()),
                    "email": state.user.as_ref().map(|u| u.email.clone()),
                    "role": state.user.as_ref().map(|u| bike_rental_client::app::render::role_label(&u.role)),
                    "baseUrl": app.api().base_url().as_str(),
                }),
                format,
            );
        }
        _ => {}
    }

    if !enter_page(app, &cli.route_path())? {
        return Ok(());
    }

    match &cli.command {
        Command::Login { email, password } => {
            let form = LoginForm {
                email: email.clone(),
                password: password.clone(),
            };
            form.validate()?;
            finish(app.session().login(&form).await)?;
            if let Some(user) = app.session().user() {
                println!("Welcome back, {}!", user.name);
            }
        }
        Command::Signup {
            name,
            email,
            password,
            password_confirm,
        } => {
            let form = SignupForm {
                name: name.clone(),
                email: email.clone(),
                password: password.clone(),
                password_confirm: password_confirm.clone(),
            };
            form.validate()?;
            finish(app.session().signup(&form).await)?;
        }
        Command::Logout => finish(app.session().logout().await)?,
        Command::ForgotPassword { email } => {
            let form = ForgotPasswordForm {
                email: email.clone(),
            };
            form.validate()?;
            let message = app.auth().forgot_password(&form.email).await?;
            println!("{}", message.as_deref().unwrap_or("Token sent to email!"));
        }
        Command::ResetPassword {
            token,
            password,
            password_confirm,
        } => {
            let form = ResetPasswordForm {
                password: password.clone(),
                password_confirm: password_confirm.clone(),
            };
            form.validate()?;
            if let Some(user) = app.auth().reset_password(token, &form).await? {
                app.session().replace_user(user);
            }
            println!("Password reset successfully!");
        }
        Command::UpdatePassword {
            current,
            password,
            password_confirm,
        } => {
            let form = UpdatePasswordForm {
                password_current: current.clone(),
                password: password.clone(),
                password_confirm: password_confirm.clone(),
            };
            form.validate()?;
            if let Some(user) = app.auth().update_password(&form).await? {
                app.session().replace_user(user);
            }
            println!("Password updated successfully!");
        }
        Command::UpdateMe { name, email } => {
            let form = ProfileForm {
                name: name.clone(),
                email: email.clone(),
            };
            form.validate()?;
            finish(app.session().update_profile(&form).await)?;
            if let Some(user) = app.session().user() {
                print_record(&user, format)?;
            }
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                bail!("Refusing to delete the account without --yes");
            }
            app.auth().delete_account().await?;
            finish(app.session().logout().await)?;
            println!("Account deleted.");
        }
        Command::Preferences {
            min_price,
            max_price,
            min_engine_cc,
            max_engine_cc,
            min_weight,
            max_weight,
        } => {
            let preferences = Preferences {
                price: Range {
                    min: *min_price,
                    max: *max_price,
                },
                engine_cc: Range {
                    min: *min_engine_cc,
                    max: *max_engine_cc,
                },
                weight: Range {
                    min: *min_weight,
                    max: *max_weight,
                },
            };
            preferences.validate()?;
            if let Some(user) = app.auth().set_preferences(&preferences).await? {
                app.session().replace_user(user);
            }
            println!("Preferences saved.");
        }
        Command::Recommend => {
            let bikes = app.auth().get_recommendations().await?;
            print(render_list(&bikes, format)?)?;
        }
        Command::Overview => {
            let overview = app.overview().await?;
            print_record(&overview, format)?;
            if format == OutputFormat::Table {
                println!("\nRecent bikes");
                print(render_list(&overview.recent_bikes, format)?)?;
                println!("\nTop 5 cheapest");
                print(render_list(&overview.top_cheap_bikes, format)?)?;
            }
        }
        Command::Bikes(command) => bikes(app, command, format).await?,
        Command::Bookings(command) => bookings(app, command, format).await?,
        Command::Admin(AdminCommand::Users(command)) => users(app, command, format).await?,
        Command::Route { .. } | Command::Nav { .. } | Command::Status => {}
    }

    Ok(())
}

/// 套用路由守衛；回傳 false 表示指令不需要再執行
fn enter_page<S: SessionStore>(app: &RentalApp<S>, path: &str) -> anyhow::Result<bool> {
    match app.visit(path) {
        RouteDecision::Render(page) => {
            tracing::debug!("📄 {}", page.title());
            Ok(true)
        }
        RouteDecision::Redirect { to, .. } if to == LOGIN_PATH => Err(ClientError::Unauthorized {
            message: Some("Please log in first".to_string()),
        }
        .into()),
        RouteDecision::Redirect { .. } => {
            let name = app
                .session()
                .user()
                .map(|user| user.name)
                .unwrap_or_else(|| "current user".to_string());
            println!("Already logged in as {}. Run `bike-rental logout` first.", name);
            Ok(false)
        }
        RouteDecision::AccessDenied => Err(ClientError::ApiError {
            status: 403,
            message: Some("You do not have permission to access this page".to_string()),
        }
        .into()),
        RouteDecision::Loading { text } => Err(anyhow!("Session is still loading ({})", text)),
    }
}

async fn bikes<S: SessionStore>(
    app: &RentalApp<S>,
    command: &BikesCommand,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        BikesCommand::List {
            search,
            sort,
            min_price,
            max_price,
            min_rating,
            page,
            limit,
        } => {
            let query = BikeQuery {
                search: search.clone(),
                sort: *sort,
                min_price: *min_price,
                max_price: *max_price,
                min_rating: *min_rating,
                page: *page,
                limit: *limit,
            };
            let list = app.bikes().bikes(&query).await?;
            print(render_list(&list.bikes, format)?)?;
            if format == OutputFormat::Table {
                println!("\n{} bike(s) found", list.results);
            }
        }
        BikesCommand::Show { id } => {
            let bike = app
                .bikes()
                .bike(id)
                .await?
                .ok_or_else(|| anyhow!("Bike {} not found", id))?;
            print_record(&bike, format)?;
        }
        BikesCommand::TopCheap => {
            let bikes = app.bikes().top_cheap().await?;
            print(render_list(&bikes, format)?)?;
        }
        BikesCommand::Stats => {
            let stats = app.bikes().stats().await?;
            print_record(&stats, format)?;
        }
        BikesCommand::Create {
            name,
            engine_cc,
            weight,
            price,
            price_discount,
            summary,
            description,
        } => {
            let form = BikeForm {
                name: name.clone(),
                engine_cc: *engine_cc,
                weight: *weight,
                price: *price,
                price_discount: *price_discount,
                summary: summary.clone(),
                description: description.clone(),
                ratings_average: None,
            };
            form.validate()?;
            let bike = app.bikes().create_bike(&form).await?;
            print_record(&bike, format)?;
        }
        BikesCommand::Update {
            id,
            name,
            engine_cc,
            weight,
            price,
            price_discount,
            summary,
            description,
        } => {
            let mut patch = Map::new();
            insert_some(&mut patch, "name", name.clone().map(Value::from));
            insert_some(&mut patch, "engineCC", engine_cc.map(Value::from));
            insert_some(&mut patch, "weight", weight.map(Value::from));
            insert_some(&mut patch, "price", price.map(Value::from));
            insert_some(&mut patch, "priceDiscount", price_discount.map(Value::from));
            insert_some(&mut patch, "summary", summary.clone().map(Value::from));
            insert_some(&mut patch, "description", description.clone().map(Value::from));
            if patch.is_empty() {
                bail!("Nothing to update; pass at least one field");
            }
            let bike = app.bikes().update_bike(id, &patch).await?;
            print_record(&bike, format)?;
        }
        BikesCommand::Delete { id } => app.bikes().delete_bike(id).await?,
        BikesCommand::Recluster => {
            let result = app.bikes().recluster().await?;
            if format == OutputFormat::Json {
                print_record(&result, format)?;
            }
        }
    }
    Ok(())
}

async fn bookings<S: SessionStore>(
    app: &RentalApp<S>,
    command: &BookingsCommand,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        BookingsCommand::Create {
            bike,
            pickup,
            drop_location,
            start,
            end,
        } => {
            let form = BookingForm {
                bike: bike.clone(),
                pickup_location: pickup.clone(),
                drop_location: drop_location.clone(),
                start_date: Some(*start),
                end_date: Some(*end),
            };
            let booking = app.bookings().create_booking(&form).await?;
            print_record(&booking, format)?;
        }
        BookingsCommand::Cancel { id } => {
            if let Some(booking) = app.bookings().cancel_booking(id).await? {
                print_record(&booking, format)?;
            }
        }
        BookingsCommand::List => {
            let profile = app.bookings().my_bookings().await?;
            print(render_list(&profile.bookings, format)?)?;
        }
    }
    Ok(())
}

async fn users<S: SessionStore>(
    app: &RentalApp<S>,
    command: &UsersCommand,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        UsersCommand::List {
            role,
            sort,
            page,
            limit,
        } => {
            let query = UserQuery {
                role: role.clone(),
                sort: sort.clone(),
                page: *page,
                limit: *limit,
            };
            let users = app.admin().users(&query).await?;
            print(render_list(&users, format)?)?;
        }
        UsersCommand::Show { id } => {
            let user = app
                .admin()
                .user(id)
                .await?
                .ok_or_else(|| anyhow!("User {} not found", id))?;
            print_record(&user, format)?;
        }
        UsersCommand::Update {
            id,
            name,
            email,
            role,
        } => {
            let mut patch = Map::new();
            insert_some(&mut patch, "name", name.clone().map(Value::from));
            insert_some(&mut patch, "email", email.clone().map(Value::from));
            insert_some(&mut patch, "role", role.clone().map(Value::from));
            if patch.is_empty() {
                bail!("Nothing to update; pass --name, --email or --role");
            }
            let user = app.admin().update_user(id, &patch).await?;
            print_record(&user, format)?;
        }
        UsersCommand::Delete { id } => app.admin().delete_user(id).await?,
    }
    Ok(())
}

/// toast 已經顯示過，失敗時只需要結束碼
fn finish(outcome: ActionOutcome) -> anyhow::Result<()> {
    if outcome.success {
        return Ok(());
    }
    Err(anyhow!(outcome
        .error
        .unwrap_or_else(|| "Request failed".to_string())))
}

fn insert_some(patch: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        patch.insert(key.to_string(), value);
    }
}

fn print_record<T: serde::Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    print(render_record(value, format)?)
}

fn print(output: String) -> anyhow::Result<()> {
    println!("{}", output);
    Ok(())
}
