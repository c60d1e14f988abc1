use std::sync::Arc;

use anyhow::Context;
use kaiwa_client::{
    api::{AuthToken, Comment, CommentRef, Subject, TargetKind, VoteDirection, VoteTarget},
    CommentList, CommentOrder, CommentPager, CommentWriter, Config, Draft, HttpApi,
    RenderedText, ThreadFetcher, VoteClient,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Base URL of the comment service, defaults to KAIWA_API_URL
    #[structopt(short, long)]
    host: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print every reply below a comment
    Thread {
        root: String,

        /// Newest first, instead of depth-first
        #[structopt(long)]
        newest: bool,
    },

    /// Print one page of the top-level comments of a subject
    List {
        content_type: String,
        slug: String,

        #[structopt(long, default_value = "1")]
        page: u32,

        #[structopt(long)]
        size: Option<u32>,
    },

    /// Post a comment (needs KAIWA_TOKEN)
    Comment {
        content_type: String,
        slug: String,
        text: String,

        /// Reference of the comment to reply to
        #[structopt(long)]
        parent: Option<String>,

        #[structopt(long)]
        spoiler: bool,
    },

    /// Vote on a comment or an article (needs KAIWA_TOKEN)
    Vote {
        /// comment or article
        kind: TargetKind,
        reference: String,

        /// up, down or none
        direction: VoteDirection,
    },

    /// Show how a text would be displayed
    Render { text: String },
}

fn auth_token() -> anyhow::Result<AuthToken> {
    let tok = std::env::var("KAIWA_TOKEN").context("retrieving KAIWA_TOKEN environment variable")?;
    Ok(AuthToken(tok))
}

fn print_comment(c: &Comment) {
    let indent = "  ".repeat(c.level);
    let author = c.author_name().unwrap_or("[deleted]");
    let replying = c
        .parent_info
        .as_ref()
        .and_then(|p| p.username.as_deref())
        .map(|u| format!(" > @{u}"))
        .unwrap_or_default();
    println!("{indent}[{}] @{author}{replying} ({:+})", c.reference, c.vote_score);
    for line in RenderedText::new(&c.text).display().lines() {
        println!("{indent}  {line}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    if let Command::Render { text } = &opt.cmd {
        let rendered = RenderedText::new(&kaiwa_client::normalize(text));
        for span in rendered.spans() {
            println!("{span:?}");
        }
        println!("{}", rendered.display());
        return Ok(());
    }

    let cfg = match opt.host {
        Some(host) => Config::new(host),
        None => Config::from_env()?,
    };
    let api = Arc::new(HttpApi::new(&cfg)?);

    match opt.cmd {
        // needs no server, done above
        Command::Render { .. } => (),
        Command::Thread { root, newest } => {
            let mut comments = ThreadFetcher::new(api)
                .with_max_depth(cfg.max_depth)
                .fetch_thread(&CommentRef::new(root))
                .await?;
            if newest {
                CommentOrder::Newest.sort(&mut comments);
            }
            for c in &comments {
                print_comment(c);
            }
        }
        Command::List {
            content_type,
            slug,
            page,
            size,
        } => {
            let mut pager = CommentPager::from_config(api, &cfg, Subject::new(content_type, slug));
            if let Some(size) = size {
                pager = pager.with_page_size(size);
            }
            let res = pager.fetch_page(page).await?;
            for c in &res.comments {
                print_comment(c);
            }
            let p = res.pagination;
            println!("page {} of {}", p.page, p.pages);
        }
        Command::Comment {
            content_type,
            slug,
            text,
            parent,
            spoiler,
        } => {
            let mut draft = Draft::new(Subject::new(content_type, slug), text).spoiler(spoiler);
            if let Some(p) = parent {
                draft = draft.reply_to(CommentRef::new(p));
            }
            draft.check_length()?;
            let token = auth_token()?;
            let out = CommentWriter::new(api)
                .submit(&mut CommentList::new(), &draft, None, Some(&token))
                .await?;
            println!("{}", out.confirmed.reference);
        }
        Command::Vote {
            kind,
            reference,
            direction,
        } => {
            let token = auth_token()?;
            let target = VoteTarget { kind, reference };
            let out = VoteClient::new(api)
                .set_vote(&target, direction, Some(&token))
                .await?;
            match out.aggregate {
                Some(score) => println!("{target}: {score:+}"),
                None => println!("{target}: voted {direction:?}"),
            }
        }
    }

    Ok(())
}
