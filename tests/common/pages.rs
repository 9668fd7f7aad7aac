pub const POSTING_URL: &str = "https://jobs.example.com/posting/1";
pub const FORM_URL: &str = "https://jobs.example.com/apply/1";
pub const DONE_URL: &str = "https://jobs.example.com/apply/1/done";

pub const DESCRIPTION_PAGE: &str = r#"
<html>
<head><title>Software Engineer</title></head>
<body>
  <main>
    <h1>Software Engineer</h1>
    <p>Build the tools our analysts rely on every day.</p>
    <a href="/apply/1">Apply Now</a>
  </main>
</body>
</html>"#;

pub const FORM_PAGE: &str = r#"
<html>
<head><title>Apply</title></head>
<body>
  <form>
    <label for="first_name">First Name</label>
    <input type="text" id="first_name" name="first_name">
    <button type="submit" id="submit">Submit Application</button>
  </form>
</body>
</html>"#;

pub const DONE_PAGE: &str = r#"
<html>
<head><title>Done</title></head>
<body>
  <h1>Thank you for applying!</h1>
  <p>We will review your profile shortly.</p>
</body>
</html>"#;

pub const SIGN_IN_PAGE: &str = r#"
<html>
<body>
  <form>
    <label for="email">Email Address</label>
    <input type="email" id="email" name="email">
    <label for="password">Password</label>
    <input type="password" id="password" name="password">
    <button type="submit" id="signin">Sign In</button>
  </form>
  <a href="/register">Create Account</a>
</body>
</html>"#;

/// A sign-up button on a page with a single password field.
pub const MISLABELLED_SIGN_IN_PAGE: &str = r#"
<html>
<body>
  <form>
    <label for="email">Email Address</label>
    <input type="email" id="email" name="email">
    <label for="password">Password</label>
    <input type="password" id="password" name="password">
    <button type="submit" id="register">Create Account</button>
    <button type="submit" id="login">Sign In</button>
  </form>
</body>
</html>"#;

pub const SIGN_UP_PAGE: &str = r#"
<html>
<body>
  <form>
    <label for="email">Email Address</label>
    <input type="email" id="email" name="email">
    <label for="password">Password</label>
    <input type="password" id="password" name="password">
    <label for="verify_password">Verify New Password</label>
    <input type="password" id="verify_password" name="verify_password">
    <button type="submit" id="create">Create Account</button>
  </form>
</body>
</html>"#;

pub const SPONSORSHIP_PAGE: &str = r#"
<html>
<body>
  <form>
    <fieldset>
      <legend>Will you now or in the future require sponsorship for employment visa status?</legend>
      <label><input type="radio" name="sponsorship" value="yes"> Yes</label>
      <label><input type="radio" name="sponsorship" value="no"> No</label>
    </fieldset>
    <button type="submit" id="next">Next</button>
  </form>
</body>
</html>"#;

pub const TWO_JOBS_PAGE: &str = r#"
<html>
<body>
  <form>
    <div class="entry">
      <label for="title_1">Job Title</label>
      <input type="text" id="title_1" name="title_1">
    </div>
    <div class="entry">
      <label for="title_2">Job Title</label>
      <input type="text" id="title_2" name="title_2">
    </div>
  </form>
</body>
</html>"#;
